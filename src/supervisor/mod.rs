//! Flow Supervisor: observes per-(venue, market, symbol) message-arrival
//! health and drives recovery through the WebSocket Manager, grouping
//! recovery by connection so one repair pass can fix many flows at once.

mod health;
pub mod listener;
mod recovery;
mod subscription;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex as SyncMutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::wsmgr::Reopener;

pub use health::{FlowHealth, FlowStatus};
pub use listener::FlowListener;
pub use recovery::RecoveryGuard;
pub use subscription::SupervisedSubscription;

const DEFAULT_HEALTH_CHECK_INTERVAL_SECS: u64 = 30;
const DEFAULT_RECOVERY_CHECK_INTERVAL_SECS: u64 = 60;
/// Placeholder cadence used when a caller hasn't supplied a per-flow
/// expected interval; flows register their own via [`FlowSupervisor::register`].
const DEFAULT_EXPECTED_INTERVAL_SECS: f64 = 5.0;

/// Per-status tallies returned by [`FlowSupervisor::report`].
#[derive(Debug, Clone, Default)]
pub struct StatusTally {
    pub healthy: u32,
    pub warning: u32,
    pub critical: u32,
    pub unknown: u32,
}

/// Operational snapshot suitable for a dashboard.
#[derive(Debug, Clone, Default)]
pub struct FlowReport {
    pub total_subscriptions: usize,
    pub active_subscriptions: usize,
    pub tally: StatusTally,
}

/// Singleton attached to a WebSocket Manager: holds the subscription and
/// health registries and runs the periodic health/recovery loops.
pub struct FlowSupervisor {
    subscriptions: DashMap<String, Arc<SupervisedSubscription>>,
    health: DashMap<(String, String, String), Arc<FlowHealth>>,
    reopener: Arc<dyn Reopener>,
    recovery_guard: RecoveryGuard,
    health_check_interval: Duration,
    recovery_check_interval: Duration,
    tasks: SyncMutex<Vec<JoinHandle<()>>>,
}

impl FlowSupervisor {
    #[must_use]
    pub fn new(reopener: Arc<dyn Reopener>) -> Arc<Self> {
        Self::with_intervals(
            reopener,
            Duration::from_secs(DEFAULT_HEALTH_CHECK_INTERVAL_SECS),
            Duration::from_secs(DEFAULT_RECOVERY_CHECK_INTERVAL_SECS),
        )
    }

    #[must_use]
    pub fn with_intervals(
        reopener: Arc<dyn Reopener>,
        health_check_interval: Duration,
        recovery_check_interval: Duration,
    ) -> Arc<Self> {
        let supervisor = Arc::new(Self {
            subscriptions: DashMap::new(),
            health: DashMap::new(),
            reopener,
            recovery_guard: RecoveryGuard::new(),
            health_check_interval,
            recovery_check_interval,
            tasks: SyncMutex::new(Vec::new()),
        });
        supervisor.clone().spawn_loops();
        supervisor
    }

    fn spawn_loops(self: Arc<Self>) {
        let health_loop = {
            let supervisor = self.clone();
            tokio::spawn(async move { supervisor.health_check_loop().await })
        };
        let recovery_loop = {
            let supervisor = self.clone();
            tokio::spawn(async move { supervisor.recovery_check_loop().await })
        };
        let mut tasks = self.tasks.lock();
        tasks.push(health_loop);
        tasks.push(recovery_loop);
    }

    /// Create or extend the subscription record for (venue, market) and
    /// ensure a FlowHealth exists for every symbol. Returns the
    /// subscription key.
    pub fn register(&self, venue: &str, market: &str, symbols: &[String]) -> String {
        let key = format!("{venue}:{market}");
        let entry = self.subscriptions.entry(key.clone()).or_insert_with(|| {
            Arc::new(SupervisedSubscription::new(
                venue.to_string(),
                market.to_string(),
                symbols.iter().cloned().collect(),
            ))
        });
        entry.extend_symbols(symbols.iter().cloned());

        for symbol in symbols {
            self.health
                .entry((venue.to_string(), market.to_string(), symbol.clone()))
                .or_insert_with(|| {
                    Arc::new(FlowHealth::new(
                        venue.to_string(),
                        market.to_string(),
                        symbol.clone(),
                        DEFAULT_EXPECTED_INTERVAL_SECS,
                    ))
                });
        }

        key
    }

    pub fn mark_active(&self, key: &str, connection_id: &str) {
        if let Some(sub) = self.subscriptions.get(key) {
            sub.mark_active(connection_id.to_string());
        }
    }

    pub fn mark_inactive(&self, key: &str) {
        if let Some(sub) = self.subscriptions.get(key) {
            sub.mark_inactive();
        }
    }

    async fn health_check_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.health_check_interval);
        loop {
            ticker.tick().await;
            let report = self.report();
            debug!(
                healthy = report.tally.healthy,
                warning = report.tally.warning,
                critical = report.tally.critical,
                unknown = report.tally.unknown,
                "flow health evaluated"
            );

            // A flow going CRITICAL demotes its owning subscription to
            // inactive so the next recovery pass picks it up — health
            // observation and recovery dispatch stay on separate cadences
            // per §4.5, but a critical flow must not sit unrecovered until
            // something else happens to flip the subscription's flag.
            for entry in self.health.iter() {
                let (venue, market, _symbol) = entry.key();
                if entry.value().status() == FlowStatus::Critical {
                    let key = format!("{venue}:{market}");
                    if let Some(sub) = self.subscriptions.get(&key) {
                        if sub.is_active() {
                            sub.mark_inactive();
                        }
                    }
                }
            }
        }
    }

    async fn recovery_check_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.recovery_check_interval);
        loop {
            ticker.tick().await;
            let subs: Vec<Arc<SupervisedSubscription>> = self
                .subscriptions
                .iter()
                .map(|e| e.value().clone())
                .collect();
            self.recovery_guard.recover_inactive(&self.reopener, &subs).await;
        }
    }

    #[must_use]
    pub fn report(&self) -> FlowReport {
        let mut tally = StatusTally::default();
        for entry in self.health.iter() {
            match entry.value().status() {
                FlowStatus::Healthy => tally.healthy += 1,
                FlowStatus::Warning => tally.warning += 1,
                FlowStatus::Critical => tally.critical += 1,
                FlowStatus::Unknown => tally.unknown += 1,
            }
        }
        let active = self.subscriptions.iter().filter(|e| e.value().is_active()).count();
        FlowReport {
            total_subscriptions: self.subscriptions.len(),
            active_subscriptions: active,
            tally,
        }
    }

    pub fn close(&self) {
        for handle in self.tasks.lock().drain(..) {
            handle.abort();
        }
    }
}

impl FlowListener for FlowSupervisor {
    fn record_update(&self, venue: &str, market: &str, symbol: &str) {
        let key = (venue.to_string(), market.to_string(), symbol.to_string());
        if let Some(health) = self.health.get(&key) {
            health.update_received();
        }
    }

    fn record_error(&self, venue: &str, market: &str, symbol: &str) {
        let key = (venue.to_string(), market.to_string(), symbol.to_string());
        if let Some(health) = self.health.get(&key) {
            health.error_occurred();
        }
    }
}

impl Drop for FlowSupervisor {
    fn drop(&mut self) {
        self.close();
    }
}
