//! WebSocket Manager: opens, wraps, multiplexes, monitors, and reconnects
//! venue WebSocket connections. The most complex component in the crate.

mod backoff;
mod buffer;
mod circuit;
mod config;
mod connection;
mod dedup;
mod manager;
mod reopener;
mod routing;
mod stash;
mod subscription;
mod wrapper;

pub use backoff::{attempts_exhausted, is_unbounded, reconnect_delay};
pub use buffer::{BufferedMessage, CircularBuffer};
pub use circuit::CircuitBreaker;
pub use config::WebSocketConfig;
pub use connection::Connection;
pub use dedup::{DedupFields, Deduper};
pub use manager::{WebSocketManager, WebSocketManagerStats};
pub use reopener::Reopener;
pub use routing::{DataType, Dialect, ParsedMessage};
pub use stash::ReconnectionStash;
pub use subscription::{Subscription, SubscriptionCallback};
pub use wrapper::{TransportKind, WebSocketWrapper};
