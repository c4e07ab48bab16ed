//! Resource Governor: tracked-object leak detection, a generic pool for
//! non-HTTP handles, memory/CPU pressure sampling, and an alert bus.

mod alerts;
mod memory;
mod pool;
mod tracked;

use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex as SyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub use alerts::{Alert, AlertBus, AlertCallback, AlertLevel, AlertType};
pub use memory::{MemorySample, MemoryThresholds};
pub use pool::ConnectionPool;
pub use tracked::{TrackedRegistry, TrackedStats};

const SAMPLE_HISTORY_CAP: usize = 1_000;
const SAMPLE_HISTORY_TRIM_TO: usize = 500;
const MIN_FORCED_GC_INTERVAL_SECS: i64 = 10;
const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 15;
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 30;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Returned by [`ResourceGovernor::managed`]: tracks on construction,
/// untracks (running any cleanup hook) on drop, regardless of how the
/// caller's scope exits.
pub struct ManagedGuard {
    governor: Arc<ResourceGovernor>,
    id: u64,
}

impl Drop for ManagedGuard {
    fn drop(&mut self) {
        self.governor.tracked.untrack(self.id);
    }
}

/// Tracks leaked-handle risk, pools non-HTTP handles with TTL eviction,
/// samples memory pressure, and raises rate-limited alerts.
///
/// Holds only non-owning (weak) references —
/// the tracked registry never keeps anything alive.
pub struct ResourceGovernor {
    tracked: TrackedRegistry,
    alerts: AlertBus,
    thresholds: MemoryThresholds,
    samples: SyncMutex<VecDeque<MemorySample>>,
    last_forced_gc_ms: AtomicI64,
    tasks: SyncMutex<Vec<JoinHandle<()>>>,
    /// Pool of non-HTTP handles (e.g. pooled WebSocket wrappers reused
    /// outside the manager, DNS resolvers, raw TCP streams) with TTL
    /// eviction.
    pool: ConnectionPool<String, Arc<dyn Any + Send + Sync>>,
}

const DEFAULT_POOL_TTL_SECS: u64 = 300;
const DEFAULT_POOL_CAPACITY: usize = 256;

impl ResourceGovernor {
    #[must_use]
    pub fn new(thresholds: MemoryThresholds) -> Arc<Self> {
        Self::with_pool(
            thresholds,
            Duration::from_secs(DEFAULT_POOL_TTL_SECS),
            DEFAULT_POOL_CAPACITY,
        )
    }

    #[must_use]
    pub fn with_pool(thresholds: MemoryThresholds, pool_ttl: Duration, pool_capacity: usize) -> Arc<Self> {
        let governor = Arc::new(Self {
            tracked: TrackedRegistry::new(),
            alerts: AlertBus::new(),
            thresholds,
            samples: SyncMutex::new(VecDeque::new()),
            last_forced_gc_ms: AtomicI64::new(0),
            tasks: SyncMutex::new(Vec::new()),
            pool: ConnectionPool::new(pool_ttl, pool_capacity),
        });
        governor.clone().spawn_loops();
        governor
    }

    /// Acquire a pooled non-HTTP handle for `key`, reusing it unless
    /// `is_closed` reports it dead or it's past TTL.
    pub fn pool_acquire<V, F, IsClosed>(&self, key: String, is_closed: IsClosed, builder: F) -> Option<Arc<V>>
    where
        V: Any + Send + Sync,
        F: FnOnce() -> Arc<V>,
        IsClosed: Fn(&Arc<dyn Any + Send + Sync>) -> bool,
    {
        let erased = self.pool.acquire(
            key,
            is_closed,
            move || -> Arc<dyn Any + Send + Sync> { builder() },
        )?;
        erased.downcast::<V>().ok()
    }

    pub fn pool_remove(&self, key: &String) {
        self.pool.remove(key);
    }

    #[must_use]
    pub fn pool_utilization(&self) -> f64 {
        self.pool.utilization()
    }

    fn spawn_loops(self: Arc<Self>) {
        let monitor = {
            let governor = self.clone();
            tokio::spawn(async move { governor.monitor_loop().await })
        };
        let cleanup = {
            let governor = self.clone();
            tokio::spawn(async move { governor.cleanup_loop().await })
        };
        let mut tasks = self.tasks.lock();
        tasks.push(monitor);
        tasks.push(cleanup);
    }

    pub fn register_alert_callback(&self, callback: AlertCallback) {
        self.alerts.register(callback);
    }

    /// Track `handle` under `label` for the returned guard's lifetime; drop
    /// the guard (end of scope, early return, or panic unwind) to untrack
    /// and, if supplied, run `on_cleanup`.
    pub fn managed<T: std::any::Any + Send + Sync>(
        self: &Arc<Self>,
        handle: &Arc<T>,
        label: &str,
        on_cleanup: Option<Box<dyn FnOnce() + Send>>,
    ) -> ManagedGuard {
        let id = self.tracked.track(handle, label);
        if let Some(hook) = on_cleanup {
            self.tracked.set_cleanup(id, hook);
        }
        ManagedGuard {
            governor: self.clone(),
            id,
        }
    }

    #[must_use]
    pub fn tracked_stats(&self) -> TrackedStats {
        self.tracked.stats()
    }

    #[must_use]
    pub fn alert_history(&self) -> Vec<Alert> {
        self.alerts.history()
    }

    #[must_use]
    pub fn recent_samples(&self, n: usize) -> Vec<MemorySample> {
        let samples = self.samples.lock();
        let len = samples.len();
        samples.iter().skip(len.saturating_sub(n)).copied().collect()
    }

    async fn monitor_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(DEFAULT_MONITOR_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            let sample = memory::sample();
            self.push_sample(sample);
            self.check_alerts(sample);
        }
    }

    fn push_sample(&self, sample: MemorySample) {
        let mut samples = self.samples.lock();
        samples.push_back(sample);
        if samples.len() > SAMPLE_HISTORY_CAP {
            let drop_count = samples.len() - SAMPLE_HISTORY_TRIM_TO;
            for _ in 0..drop_count {
                samples.pop_front();
            }
        }
    }

    fn check_alerts(&self, sample: MemorySample) {
        if sample.rss_bytes > self.thresholds.rss_bytes_ceiling {
            self.alerts.fire(
                AlertType::Memory,
                AlertLevel::Warning,
                "RSS above configured ceiling",
                sample.rss_bytes as f64,
            );
        }
        if sample.system_percent > self.thresholds.system_percent_ceiling {
            self.alerts.fire(
                AlertType::Memory,
                AlertLevel::Critical,
                "system memory pressure above ceiling",
                sample.system_percent,
            );
        }
        if sample.cpu_percent > self.thresholds.cpu_percent_ceiling {
            self.alerts.fire(
                AlertType::Cpu,
                AlertLevel::Warning,
                "cpu pressure above ceiling",
                sample.cpu_percent,
            );
        }
        let utilization = self.pool.utilization();
        if utilization > self.thresholds.pool_utilization_fraction {
            self.alerts.fire(
                AlertType::PoolUtilization,
                AlertLevel::Warning,
                "pool utilization above configured fraction",
                utilization,
            );
        }
    }

    async fn cleanup_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS));
        loop {
            ticker.tick().await;
            let stats = self.tracked.stats();
            self.pool.evict_expired();
            debug!(tracked_total = stats.total, pool_size = self.pool.len(), "governor cleanup sweep");

            let sample = memory::sample();
            if sample.exceeds(&self.thresholds) {
                self.maybe_force_gc_hint();
            }
        }
    }

    /// Forces a GC-equivalent hint, rate-limited to at least 10s apart.
    fn maybe_force_gc_hint(&self) {
        let now = now_ms();
        let last = self.last_forced_gc_ms.load(Ordering::Relaxed);
        if now - last < MIN_FORCED_GC_INTERVAL_SECS * 1000 {
            return;
        }
        self.last_forced_gc_ms.store(now, Ordering::Relaxed);
        warn!("memory pressure above threshold, forcing allocator trim hint");
        // Rust has no runtime GC to nudge; this is the allocator-trim
        // equivalent other languages in this fleet use a GC hint for.
        #[cfg(target_os = "linux")]
        unsafe {
            libc::malloc_trim(0);
        }
    }

    pub fn close(&self) {
        for handle in self.tasks.lock().drain(..) {
            handle.abort();
        }
    }
}

impl Drop for ResourceGovernor {
    fn drop(&mut self) {
        self.close();
    }
}
