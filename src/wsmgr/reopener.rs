//! The capability the Flow Supervisor uses to ask the WebSocket Manager to
//! restore a subscription, injected rather than owned: the
//! manager implements this trait, the supervisor only holds a trait object.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait Reopener: Send + Sync {
    /// Re-establish a (venue, market) subscription for the given symbols,
    /// returning the id of the connection now serving it. Idempotent:
    /// calling this again while a previous call for the same key is still
    /// in flight is a no-op that returns the in-flight connection id.
    async fn resubscribe(
        &self,
        venue: &str,
        market: &str,
        symbols: &[String],
    ) -> Result<String>;
}
