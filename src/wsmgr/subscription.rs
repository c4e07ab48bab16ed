//! `Subscription`: a (venue, market, symbols) registration with a routed
//! callback.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use super::routing::DataType;

/// Callback invoked for each routed message matching a subscription.
/// Invocation is isolated by the caller: panics/errors never abort routing
/// of other callbacks or later messages.
pub type SubscriptionCallback = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// A (venue, market, symbols) registration tied to one connection while
/// active.
pub struct Subscription {
    pub venue: String,
    pub market: String,
    pub data_type: DataType,
    symbols: Mutex<HashSet<String>>,
    pub callback: SubscriptionCallback,
    active: AtomicBool,
    pub connection_id: Mutex<Option<String>>,
}

impl Subscription {
    #[must_use]
    pub fn new(
        venue: String,
        market: String,
        data_type: DataType,
        symbols: HashSet<String>,
        callback: SubscriptionCallback,
    ) -> Self {
        Self {
            venue,
            market,
            data_type,
            symbols: Mutex::new(symbols),
            callback,
            active: AtomicBool::new(true),
            connection_id: Mutex::new(None),
        }
    }

    /// Additive insert; duplicate symbols are no-ops.
    pub fn add_symbols(&self, symbols: impl IntoIterator<Item = String>) {
        let mut set = self.symbols.lock();
        for s in symbols {
            set.insert(s);
        }
    }

    pub fn remove_symbols(&self, symbols: &HashSet<String>) {
        let mut set = self.symbols.lock();
        set.retain(|s| !symbols.contains(s));
    }

    #[must_use]
    pub fn contains_symbol(&self, symbol: &str) -> bool {
        self.symbols.lock().contains(symbol)
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn add_symbols_is_additive_and_dedups() {
        let cb: SubscriptionCallback = Arc::new(|_, _| {});
        let sub = Subscription::new(
            "binance".into(),
            "spot".into(),
            DataType::Trade,
            HashSet::from(["s1".to_string()]),
            cb,
        );
        sub.add_symbols(["s2".to_string()]);
        sub.add_symbols(["s2".to_string()]);
        let mut symbols: Vec<_> = sub.symbols().into_iter().collect();
        symbols.sort();
        assert_eq!(symbols, vec!["s1".to_string(), "s2".to_string()]);
    }
}
