//! `ReconnectionStash`: buffers messages while a smooth handover is in
//! flight, so nothing is lost between "stop routing the old connection"
//! and "the replacement connection has taken over".

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde_json::Value;

const DEFAULT_RETENTION_SECS: i64 = 30;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StashState {
    Idle,
    Reconnecting,
}

struct Inner {
    state: StashState,
    queue: VecDeque<(i64, Value)>,
}

/// Queue of `(timestamp, message)` captured while a connection is
/// reconnecting. Entries older than the retention window are dropped on
/// `stop`.
pub struct ReconnectionStash {
    inner: Mutex<Inner>,
    retention_secs: i64,
}

impl Default for ReconnectionStash {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION_SECS)
    }
}

impl ReconnectionStash {
    #[must_use]
    pub fn new(retention_secs: i64) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: StashState::Idle,
                queue: VecDeque::new(),
            }),
            retention_secs,
        }
    }

    /// Transition IDLE -> RECONNECTING; subsequent arrivals are queued
    /// instead of routed.
    pub fn start(&self) {
        let mut inner = self.inner.lock();
        inner.state = StashState::Reconnecting;
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.lock().state == StashState::Reconnecting
    }

    /// Enqueue a message while active. No-op if not active.
    pub fn enqueue(&self, message: Value) {
        let mut inner = self.inner.lock();
        if inner.state == StashState::Reconnecting {
            inner.queue.push_back((now_ms(), message));
        }
    }

    /// Transition RECONNECTING -> IDLE, returning stashed entries younger
    /// than the retention window (oldest first) and clearing the queue.
    pub fn stop(&self) -> Vec<Value> {
        let mut inner = self.inner.lock();
        inner.state = StashState::Idle;
        let now = now_ms();
        let cutoff = now - self.retention_secs * 1000;
        let drained: Vec<Value> = inner
            .queue
            .drain(..)
            .filter(|(ts, _)| *ts >= cutoff)
            .map(|(_, msg)| msg)
            .collect();
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn idle_to_reconnecting_to_idle_roundtrip() {
        let stash = ReconnectionStash::new(30);
        assert!(!stash.is_active());
        stash.start();
        assert!(stash.is_active());
        stash.enqueue(json!({"a": 1}));
        stash.enqueue(json!({"a": 2}));
        let drained = stash.stop();
        assert_eq!(drained.len(), 2);
        assert!(!stash.is_active());
    }

    #[test]
    fn enqueue_without_active_state_is_noop() {
        let stash = ReconnectionStash::new(30);
        stash.enqueue(json!({"a": 1}));
        assert_eq!(stash.stop().len(), 0);
    }
}
