//! Circuit breaker gating reconnection attempts after repeated failure.
//!
//! Additive to the plain exponential backoff in [`super::backoff`] — it
//! never changes the delay formula, it only decides whether an attempt is
//! even made. Trips after `max_consecutive_failures` in a row, then blocks
//! attempts until a cooldown window elapses.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy)]
enum State {
    Closed,
    Open { until: Instant },
}

pub struct CircuitBreaker {
    state: Mutex<State>,
    consecutive_failures: Mutex<u32>,
    max_consecutive_failures: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(max_consecutive_failures: u32, cooldown: Duration) -> Self {
        Self {
            state: Mutex::new(State::Closed),
            consecutive_failures: Mutex::new(0),
            max_consecutive_failures,
            cooldown,
        }
    }

    /// True if the circuit is closed, or open but past its cooldown (which
    /// also resets it to closed as a side effect).
    #[must_use]
    pub fn allows(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            State::Closed => true,
            State::Open { until } => {
                if Instant::now() >= until {
                    *state = State::Closed;
                    *self.consecutive_failures.lock() = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Remaining cooldown, or `None` if the circuit is closed.
    #[must_use]
    pub fn remaining_cooldown(&self) -> Option<Duration> {
        match *self.state.lock() {
            State::Closed => None,
            State::Open { until } => Some(until.saturating_duration_since(Instant::now())),
        }
    }

    /// Record a failed attempt. Returns `true` if this call tripped the
    /// breaker (i.e. it was closed and just crossed the failure threshold).
    pub fn record_failure(&self) -> bool {
        let mut failures = self.consecutive_failures.lock();
        *failures += 1;
        if *failures >= self.max_consecutive_failures {
            let mut state = self.state.lock();
            let was_closed = matches!(*state, State::Closed);
            *state = State::Open {
                until: Instant::now() + self.cooldown,
            };
            return was_closed;
        }
        false
    }

    pub fn record_success(&self) {
        *self.consecutive_failures.lock() = 0;
        *self.state.lock() = State::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_after_threshold_and_blocks() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        assert!(breaker.allows());
        assert!(!breaker.record_failure());
        assert!(!breaker.record_failure());
        assert!(breaker.record_failure());
        assert!(!breaker.allows());
    }

    #[test]
    fn success_resets_failure_count() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        assert!(!breaker.record_failure());
        assert!(breaker.allows());
    }

    #[test]
    fn cooldown_expiry_reopens_and_resets() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        assert!(breaker.record_failure());
        assert!(!breaker.allows());
        std::thread::sleep(Duration::from_millis(20));
        assert!(breaker.allows());
        assert!(breaker.remaining_cooldown().is_none());
    }
}
