//! Global message deduplication across all connections.
//!
//! A single instance is shared by the whole [`crate::wsmgr::WebSocketManager`]
//! intentionally, for late-duplicate suppression during a smooth handover,
//! at the cost of theoretically suppressing a rare legitimate near-duplicate
//! across disjoint subscriptions.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

const DUPLICATE_WINDOW_MS: i64 = 5_000;
const PURGE_AGE_MS: i64 = 60_000;
const PURGE_PROBE_INTERVAL: u64 = 256;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Fields hashed to derive a dedup key: symbol/instrument, event time,
/// arrival timestamp, and price if present.
#[derive(Debug, Clone, Default)]
pub struct DedupFields<'a> {
    pub symbol: &'a str,
    pub event_time: Option<i64>,
    pub timestamp: Option<i64>,
    pub price: Option<&'a str>,
}

fn derive_key(fields: &DedupFields<'_>) -> u64 {
    let mut hasher = DefaultHasher::new();
    fields.symbol.hash(&mut hasher);
    fields.event_time.hash(&mut hasher);
    fields.timestamp.hash(&mut hasher);
    fields.price.hash(&mut hasher);
    hasher.finish()
}

/// Maps a derived key to the latest arrival timestamp seen for it.
pub struct Deduper {
    seen: DashMap<u64, i64>,
    probes: AtomicU64,
}

impl Default for Deduper {
    fn default() -> Self {
        Self::new()
    }
}

impl Deduper {
    #[must_use]
    pub fn new() -> Self {
        Self {
            seen: DashMap::new(),
            probes: AtomicU64::new(0),
        }
    }

    /// True iff the derived key was last seen less than 5s ago. Records the
    /// current arrival regardless of outcome. Amortizes cleanup over every
    /// `PURGE_PROBE_INTERVAL`th call.
    pub fn is_duplicate(&self, fields: &DedupFields<'_>) -> bool {
        let key = derive_key(fields);
        let now = now_ms();

        let duplicate = match self.seen.get(&key) {
            Some(last) => now - *last < DUPLICATE_WINDOW_MS,
            None => false,
        };
        self.seen.insert(key, now);

        let probe = self.probes.fetch_add(1, Ordering::Relaxed);
        if probe % PURGE_PROBE_INTERVAL == 0 {
            self.purge(now);
        }

        duplicate
    }

    fn purge(&self, now: i64) {
        self.seen.retain(|_, ts| now - *ts < PURGE_AGE_MS);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn duplicate_within_window_then_expires() {
        let dedup = Deduper::new();
        let fields = DedupFields {
            symbol: "BTCUSDT",
            event_time: Some(1),
            timestamp: Some(2),
            price: Some("100.0"),
        };
        assert!(!dedup.is_duplicate(&fields));
        assert!(dedup.is_duplicate(&fields));
    }

    #[test]
    fn distinct_keys_never_collide() {
        let dedup = Deduper::new();
        let a = DedupFields {
            symbol: "BTCUSDT",
            event_time: Some(1),
            timestamp: Some(2),
            price: None,
        };
        let b = DedupFields {
            symbol: "ETHUSDT",
            event_time: Some(1),
            timestamp: Some(2),
            price: None,
        };
        assert!(!dedup.is_duplicate(&a));
        assert!(!dedup.is_duplicate(&b));
    }

    #[test]
    fn purge_drops_stale_entries() {
        let dedup = Deduper::new();
        let fields = DedupFields {
            symbol: "X",
            event_time: None,
            timestamp: None,
            price: None,
        };
        dedup.is_duplicate(&fields);
        // Force an artificially old timestamp then purge explicitly.
        for entry in dedup.seen.iter_mut() {
            *entry.value_mut() -= PURGE_AGE_MS + 1;
        }
        dedup.purge(now_ms());
        assert!(dedup.is_empty());
        sleep(Duration::from_millis(1));
    }
}
