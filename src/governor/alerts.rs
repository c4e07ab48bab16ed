//! Alert bus: user-registered callbacks plus a bounded history ring.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tracing::error;

const HISTORY_CAP: usize = 100;
const HISTORY_TRIM_TO: usize = 50;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertType {
    Memory,
    Cpu,
    PoolUtilization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Warning,
    Critical,
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub alert_type: AlertType,
    pub level: AlertLevel,
    pub message: String,
    pub value: f64,
    pub timestamp_ms: i64,
}

pub type AlertCallback = Arc<dyn Fn(&Alert) + Send + Sync>;

/// Fires registered callbacks for each alert and retains a bounded history.
/// Callback errors (panics) never abort the caller's loop.
#[derive(Default)]
pub struct AlertBus {
    callbacks: Mutex<Vec<AlertCallback>>,
    history: Mutex<Vec<Alert>>,
}

impl AlertBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, callback: AlertCallback) {
        self.callbacks.lock().push(callback);
    }

    /// Raise an alert: append to history (trimming if over cap), then
    /// invoke every callback, isolating panics.
    pub fn fire(&self, alert_type: AlertType, level: AlertLevel, message: impl Into<String>, value: f64) {
        let alert = Alert {
            alert_type,
            level,
            message: message.into(),
            value,
            timestamp_ms: now_ms(),
        };

        {
            let mut history = self.history.lock();
            history.push(alert.clone());
            if history.len() > HISTORY_CAP {
                let drop_count = history.len() - HISTORY_TRIM_TO;
                history.drain(0..drop_count);
            }
        }

        for callback in self.callbacks.lock().iter() {
            let callback = callback.clone();
            let alert_ref = &alert;
            if std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(alert_ref))).is_err() {
                error!("alert callback panicked");
            }
        }
    }

    #[must_use]
    pub fn history(&self) -> Vec<Alert> {
        self.history.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn history_trims_on_overflow() {
        let bus = AlertBus::new();
        for i in 0..120 {
            bus.fire(AlertType::Memory, AlertLevel::Warning, "high", i as f64);
        }
        assert_eq!(bus.history().len(), HISTORY_TRIM_TO);
    }

    #[test]
    fn callback_panic_does_not_stop_other_callbacks() {
        let bus = AlertBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        bus.register(Arc::new(|_: &Alert| panic!("boom")));
        bus.register(Arc::new(move |_: &Alert| {
            count2.fetch_add(1, Ordering::SeqCst);
        }));
        bus.fire(AlertType::Cpu, AlertLevel::Critical, "cpu high", 99.0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
