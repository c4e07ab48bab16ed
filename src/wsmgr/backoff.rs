//! Reconnect backoff delay calculation, shared by the reactive supervisor
//! loop and any caller that needs to reason about retry timing.

use std::time::Duration;

/// Delay before reconnect attempt `n` (0-indexed):
/// `min(initial * backoff^n, max)`.
#[must_use]
pub fn reconnect_delay(initial: Duration, backoff: f64, max: Duration, attempt: u32) -> Duration {
    let scaled = initial.as_secs_f64() * backoff.powi(attempt as i32);
    let capped = scaled.min(max.as_secs_f64());
    Duration::from_secs_f64(capped.max(0.0))
}

/// True if `max_attempts < 0` (unbounded retries).
#[must_use]
pub const fn is_unbounded(max_attempts: i64) -> bool {
    max_attempts < 0
}

/// True if `attempt` has exhausted the configured retry budget.
#[must_use]
pub fn attempts_exhausted(attempt: u32, max_attempts: i64) -> bool {
    !is_unbounded(max_attempts) && (attempt as i64) >= max_attempts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_and_caps() {
        let initial = Duration::from_millis(1000);
        let max = Duration::from_millis(10_000);
        let d0 = reconnect_delay(initial, 2.0, max, 0);
        let d1 = reconnect_delay(initial, 2.0, max, 1);
        let d5 = reconnect_delay(initial, 2.0, max, 5);
        assert_eq!(d0, Duration::from_millis(1000));
        assert_eq!(d1, Duration::from_millis(2000));
        assert_eq!(d5, max);
    }

    #[test]
    fn delay_within_spec_bounds() {
        let initial = Duration::from_millis(500);
        let max = Duration::from_millis(30_000);
        for attempt in 0..8 {
            let d = reconnect_delay(initial, 2.0, max, attempt).as_secs_f64();
            let ideal = initial.as_secs_f64() * 2f64.powi(attempt as i32);
            let lower = ideal * 0.9;
            let upper = ideal.min(max.as_secs_f64()) * 1.1;
            assert!(d >= lower * 0.999, "attempt {attempt}: {d} < {lower}");
            assert!(d <= upper * 1.001, "attempt {attempt}: {d} > {upper}");
        }
    }

    #[test]
    fn unbounded_when_negative() {
        assert!(is_unbounded(-1));
        assert!(!is_unbounded(0));
        assert!(!attempts_exhausted(3, -1));
        assert!(attempts_exhausted(3, 3));
        assert!(!attempts_exhausted(2, 3));
    }
}
