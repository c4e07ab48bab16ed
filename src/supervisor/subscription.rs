//! The Flow Supervisor's own record of a registered (venue, market, symbols)
//! subscription — distinct from [`crate::wsmgr::Subscription`], which owns
//! the routing callback. This one exists purely to drive health tracking and
//! recovery.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

/// One supervised (venue, market) subscription key and its symbol set.
pub struct SupervisedSubscription {
    pub venue: String,
    pub market: String,
    symbols: Mutex<HashSet<String>>,
    active: AtomicBool,
    connection_id: Mutex<Option<String>>,
}

impl SupervisedSubscription {
    #[must_use]
    pub fn new(venue: String, market: String, symbols: HashSet<String>) -> Self {
        Self {
            venue,
            market,
            symbols: Mutex::new(symbols),
            active: AtomicBool::new(false),
            connection_id: Mutex::new(None),
        }
    }

    pub fn extend_symbols(&self, symbols: impl IntoIterator<Item = String>) {
        let mut set = self.symbols.lock();
        for s in symbols {
            set.insert(s);
        }
    }

    #[must_use]
    pub fn symbols(&self) -> HashSet<String> {
        self.symbols.lock().clone()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn mark_active(&self, connection_id: String) {
        self.active.store(true, Ordering::Release);
        *self.connection_id.lock() = Some(connection_id);
    }

    pub fn mark_inactive(&self) {
        self.active.store(false, Ordering::Release);
        *self.connection_id.lock() = None;
    }

    #[must_use]
    pub fn connection_id(&self) -> Option<String> {
        self.connection_id.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_symbols_is_additive() {
        let sub = SupervisedSubscription::new("v".into(), "m".into(), HashSet::new());
        sub.extend_symbols(["a".to_string()]);
        sub.extend_symbols(["a".to_string(), "b".to_string()]);
        let mut symbols: Vec<_> = sub.symbols().into_iter().collect();
        symbols.sort();
        assert_eq!(symbols, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn mark_inactive_clears_connection_id() {
        let sub = SupervisedSubscription::new("v".into(), "m".into(), HashSet::new());
        sub.mark_active("c1".into());
        assert_eq!(sub.connection_id(), Some("c1".to_string()));
        sub.mark_inactive();
        assert!(!sub.is_active());
        assert_eq!(sub.connection_id(), None);
    }
}
