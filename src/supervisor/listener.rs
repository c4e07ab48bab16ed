//! The capability the WebSocket Manager uses to report message arrivals and
//! errors into the Flow Supervisor, injected rather than owned.

/// Implemented by [`crate::supervisor::FlowSupervisor`]; held by the
/// WebSocket Manager as an optional listener so the two components never
/// own each other directly.
pub trait FlowListener: Send + Sync {
    fn record_update(&self, venue: &str, market: &str, symbol: &str);
    fn record_error(&self, venue: &str, market: &str, symbol: &str);
}
