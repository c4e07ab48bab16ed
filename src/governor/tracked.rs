//! Weak `TrackedObject` registry: detects leaks without owning lifetimes.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::Mutex;

type CleanupHook = Box<dyn FnOnce() + Send>;
type ErasedWeak = Weak<dyn Any + Send + Sync>;

struct Entry {
    label: String,
    created_at: Instant,
    liveness: ErasedWeak,
    cleanup: Mutex<Option<CleanupHook>>,
}

/// Aggregate statistics over the currently-alive tracked set.
#[derive(Debug, Clone, Default)]
pub struct TrackedStats {
    pub total: usize,
    pub per_label: HashMap<String, usize>,
    pub oldest_age_secs: Option<u64>,
}

/// Weak handle registry for leak detection. Tracking a handle here never
/// keeps it alive; entries whose handle has since dropped are purged lazily
/// whenever [`TrackedRegistry::stats`] runs.
pub struct TrackedRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, Entry>>,
}

impl Default for TrackedRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackedRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Track `handle` under `label`, returning an id for later `untrack`.
    pub fn track<T: Any + Send + Sync>(&self, handle: &Arc<T>, label: &str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let erased: Arc<dyn Any + Send + Sync> = handle.clone();
        self.entries.lock().insert(
            id,
            Entry {
                label: label.to_string(),
                created_at: Instant::now(),
                liveness: Arc::downgrade(&erased),
                cleanup: Mutex::new(None),
            },
        );
        id
    }

    /// Register a cleanup hook invoked (at most once) by `untrack`.
    pub fn set_cleanup(&self, id: u64, hook: impl FnOnce() + Send + 'static) {
        if let Some(entry) = self.entries.lock().get(&id) {
            *entry.cleanup.lock() = Some(Box::new(hook));
        }
    }

    /// Stop tracking `id` and invoke its cleanup hook if one was set.
    pub fn untrack(&self, id: u64) {
        if let Some(entry) = self.entries.lock().remove(&id) {
            if let Some(hook) = entry.cleanup.lock().take() {
                hook();
            }
        }
    }

    #[must_use]
    pub fn stats(&self) -> TrackedStats {
        let mut entries = self.entries.lock();
        entries.retain(|_, e| e.liveness.strong_count() > 0);

        let mut per_label: HashMap<String, usize> = HashMap::new();
        let mut oldest: Option<Instant> = None;
        for entry in entries.values() {
            *per_label.entry(entry.label.clone()).or_insert(0) += 1;
            oldest = Some(oldest.map_or(entry.created_at, |o| o.min(entry.created_at)));
        }
        TrackedStats {
            total: entries.len(),
            per_label,
            oldest_age_secs: oldest.map(|o| o.elapsed().as_secs()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_and_untrack_invokes_cleanup_once() {
        let registry = TrackedRegistry::new();
        let handle = Arc::new(42u32);
        let id = registry.track(&handle, "widget");
        assert_eq!(registry.stats().total, 1);

        let cleaned = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let cleaned2 = cleaned.clone();
        registry.set_cleanup(id, move || cleaned2.store(true, Ordering::SeqCst));

        registry.untrack(id);
        assert!(cleaned.load(Ordering::SeqCst));
        assert_eq!(registry.stats().total, 0);
    }

    #[test]
    fn dropped_handle_is_purged_from_stats() {
        let registry = TrackedRegistry::new();
        {
            let handle = Arc::new(1u32);
            registry.track(&handle, "conn");
        }
        assert_eq!(registry.stats().total, 0);
    }

    #[test]
    fn stats_group_by_label() {
        let registry = TrackedRegistry::new();
        let a = Arc::new(1u32);
        let b = Arc::new(2u32);
        registry.track(&a, "conn");
        registry.track(&b, "conn");
        let stats = registry.stats();
        assert_eq!(stats.per_label["conn"], 2);
    }
}
