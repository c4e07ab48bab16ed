//! Connection-layer core for multi-venue cryptocurrency market-data
//! collection: proxy resolution, pooled HTTP sessions, a multiplexing
//! WebSocket manager with zero-gap reconnection, per-venue REST/WS
//! connectors, flow supervision, and resource governance.

pub mod config;
pub mod error;
pub mod governor;
pub mod proxy;
pub mod session;
pub mod supervisor;
pub mod venue;
pub mod wsmgr;

pub use error::{Error, Severity};
