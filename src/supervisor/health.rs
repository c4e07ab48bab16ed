//! `FlowHealth`: per-(venue, market, symbol) message-arrival health.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Derived status for one flow, recomputed on demand rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStatus {
    Healthy,
    Warning,
    Critical,
    Unknown,
}

impl std::fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Message-arrival health for one (venue, market, symbol) triple.
pub struct FlowHealth {
    pub venue: String,
    pub market: String,
    pub symbol: String,
    last_update_ms: AtomicI64,
    message_count: AtomicU32,
    error_count: AtomicU32,
    expected_interval_secs: f64,
    ever_updated: std::sync::atomic::AtomicBool,
}

impl FlowHealth {
    #[must_use]
    pub fn new(venue: String, market: String, symbol: String, expected_interval_secs: f64) -> Self {
        Self {
            venue,
            market,
            symbol,
            last_update_ms: AtomicI64::new(0),
            message_count: AtomicU32::new(0),
            error_count: AtomicU32::new(0),
            expected_interval_secs,
            ever_updated: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn update_received(&self) {
        self.last_update_ms.store(now_ms(), Ordering::Relaxed);
        self.message_count.fetch_add(1, Ordering::Relaxed);
        self.ever_updated.store(true, Ordering::Relaxed);
    }

    pub fn error_occurred(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn message_count(&self) -> u32 {
        self.message_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn seconds_since_last_update(&self) -> f64 {
        (now_ms() - self.last_update_ms.load(Ordering::Relaxed)) as f64 / 1000.0
    }

    /// Status rules, evaluated fresh on every call.
    #[must_use]
    pub fn status(&self) -> FlowStatus {
        if !self.ever_updated.load(Ordering::Relaxed) {
            return FlowStatus::Unknown;
        }
        let since = self.seconds_since_last_update();
        let errors = self.error_count();
        if since > 3.0 * self.expected_interval_secs || errors > 5 {
            FlowStatus::Critical
        } else if since > 2.0 * self.expected_interval_secs || errors > 2 {
            FlowStatus::Warning
        } else {
            FlowStatus::Healthy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_updated_is_unknown() {
        let h = FlowHealth::new("v".into(), "m".into(), "s".into(), 1.0);
        assert_eq!(h.status(), FlowStatus::Unknown);
    }

    #[test]
    fn fresh_update_is_healthy() {
        let h = FlowHealth::new("v".into(), "m".into(), "s".into(), 60.0);
        h.update_received();
        assert_eq!(h.status(), FlowStatus::Healthy);
    }

    #[test]
    fn many_errors_force_critical_even_when_recent() {
        let h = FlowHealth::new("v".into(), "m".into(), "s".into(), 60.0);
        h.update_received();
        for _ in 0..6 {
            h.error_occurred();
        }
        assert_eq!(h.status(), FlowStatus::Critical);
    }

    #[test]
    fn few_errors_force_warning() {
        let h = FlowHealth::new("v".into(), "m".into(), "s".into(), 60.0);
        h.update_received();
        h.error_occurred();
        h.error_occurred();
        h.error_occurred();
        assert_eq!(h.status(), FlowStatus::Warning);
    }
}
