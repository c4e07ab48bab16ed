//! Generic `ConnectionPool` for non-HTTP handles, with TTL eviction.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct Entry<V> {
    value: V,
    last_used: Instant,
}

/// A mapping `key -> handle` with at most one handle per key and TTL-based
/// eviction. `is_closed` lets the caller report that a handle died without
/// the pool needing to know the handle's type in detail.
pub struct ConnectionPool<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    ttl: Duration,
    capacity: usize,
}

impl<K, V> ConnectionPool<K, V>
where
    K: Eq + Hash + Clone,
{
    #[must_use]
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Reuse the handle for `key` unless `is_closed` reports it dead or it's
    /// past TTL, else construct one via `builder` and insert it. Evicts
    /// expired entries before checking capacity; fails if still over
    /// capacity after eviction.
    pub fn acquire<F, IsClosed>(&self, key: K, is_closed: IsClosed, builder: F) -> Option<V>
    where
        V: Clone,
        F: FnOnce() -> V,
        IsClosed: Fn(&V) -> bool,
    {
        let mut entries = self.entries.lock();
        self.evict_expired_locked(&mut entries);

        if let Some(entry) = entries.get_mut(&key) {
            if !is_closed(&entry.value) {
                entry.last_used = Instant::now();
                return Some(entry.value.clone());
            }
            entries.remove(&key);
        }

        if entries.len() >= self.capacity {
            return None;
        }

        let value = builder();
        entries.insert(
            key,
            Entry {
                value: value.clone(),
                last_used: Instant::now(),
            },
        );
        Some(value)
    }

    pub fn evict_expired(&self) {
        let mut entries = self.entries.lock();
        self.evict_expired_locked(&mut entries);
    }

    fn evict_expired_locked(&self, entries: &mut HashMap<K, Entry<V>>) {
        let ttl = self.ttl;
        entries.retain(|_, e| e.last_used.elapsed() < ttl);
    }

    pub fn remove(&self, key: &K) {
        self.entries.lock().remove(key);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current occupancy as a fraction of capacity, in `[0.0, 1.0]`.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        self.entries.lock().len() as f64 / self.capacity as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn acquire_reuses_open_handle() {
        let pool: ConnectionPool<String, u32> = ConnectionPool::new(Duration::from_secs(60), 10);
        let first = pool.acquire("k".to_string(), |_| false, || 1).unwrap();
        let second = pool.acquire("k".to_string(), |_| false, || 2).unwrap();
        assert_eq!(first, second);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn acquire_rebuilds_when_closed() {
        let pool: ConnectionPool<String, u32> = ConnectionPool::new(Duration::from_secs(60), 10);
        pool.acquire("k".to_string(), |_| false, || 1).unwrap();
        let rebuilt = pool.acquire("k".to_string(), |_| true, || 2).unwrap();
        assert_eq!(rebuilt, 2);
    }

    #[test]
    fn ttl_expiry_evicts_before_capacity_check() {
        let pool: ConnectionPool<String, u32> = ConnectionPool::new(Duration::from_millis(10), 1);
        pool.acquire("a".to_string(), |_| false, || 1).unwrap();
        sleep(Duration::from_millis(20));
        let acquired = pool.acquire("b".to_string(), |_| false, || 2);
        assert_eq!(acquired, Some(2));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn over_capacity_fails() {
        let pool: ConnectionPool<String, u32> = ConnectionPool::new(Duration::from_secs(60), 1);
        pool.acquire("a".to_string(), |_| false, || 1).unwrap();
        assert!(pool.acquire("b".to_string(), |_| false, || 2).is_none());
    }
}
