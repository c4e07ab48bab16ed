//! Grouped recovery: when a subscription goes inactive or its flows turn
//! unhealthy, re-establish it via the [`crate::wsmgr::Reopener`] capability,
//! with an idempotent re-entry guard so overlapping recovery passes don't
//! double-dispatch the same (venue, market) key.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use dashmap::DashSet;
use tracing::{info, warn};

use crate::wsmgr::Reopener;

use super::subscription::SupervisedSubscription;

/// Tracks which (venue, market) keys currently have a recovery in flight.
#[derive(Default)]
pub struct RecoveryGuard {
    in_flight: DashSet<String>,
}

impl RecoveryGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt recovery for each inactive subscription, grouped by (venue,
    /// market) so a single `resubscribe` call covers every affected symbol.
    /// Keys already in flight are skipped.
    pub async fn recover_inactive(
        &self,
        reopener: &Arc<dyn Reopener>,
        subscriptions: &[Arc<SupervisedSubscription>],
    ) {
        let mut groups: HashMap<(String, String), (HashSet<String>, Arc<SupervisedSubscription>)> =
            HashMap::new();
        for sub in subscriptions {
            if sub.is_active() {
                continue;
            }
            let entry = groups
                .entry((sub.venue.clone(), sub.market.clone()))
                .or_insert_with(|| (HashSet::new(), sub.clone()));
            entry.0.extend(sub.symbols());
        }

        for ((venue, market), (symbols, sub)) in groups {
            let key = format!("{venue}:{market}");
            if !self.in_flight.insert(key.clone()) {
                continue;
            }
            let symbols: Vec<String> = symbols.into_iter().collect();
            match reopener.resubscribe(&venue, &market, &symbols).await {
                Ok(connection_id) => {
                    info!(venue, market, connection_id, "flow recovery succeeded");
                    sub.mark_active(connection_id);
                }
                Err(e) => {
                    warn!(venue, market, error = %e, "flow recovery attempt failed");
                }
            }
            self.in_flight.remove(&key);
        }
    }
}
