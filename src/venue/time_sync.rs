//! `TimeSyncOffset`: signed milliseconds added to local wall time to
//! approximate venue server time.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Timestamps before this are rejected by [`TimeSyncOffset::validate`] —
/// 2017-01-01T00:00:00Z in epoch milliseconds, a sanity floor shared by the
/// venues this connector targets.
const MIN_VALID_TIMESTAMP_MS: i64 = 1_483_228_800_000;
/// Forward clock-skew tolerance allowed past `server_time()`.
const FUTURE_TOLERANCE_MS: i64 = 10_000;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Local-to-venue clock offset, refreshed by periodic sync calls.
#[derive(Default)]
pub struct TimeSyncOffset {
    offset_ms: AtomicI64,
    time_syncs: AtomicU32,
}

impl TimeSyncOffset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an offset computed from a round-trip: `(t_send + t_recv) / 2`
    /// against the venue-reported time. Bumps `time_syncs`.
    pub fn record(&self, t_send_ms: i64, t_recv_ms: i64, venue_time_ms: i64) {
        let local_mid = (t_send_ms + t_recv_ms) / 2;
        self.offset_ms.store(venue_time_ms - local_mid, Ordering::Relaxed);
        self.time_syncs.fetch_add(1, Ordering::Relaxed);
    }

    /// A failed sync attempt resets the offset to zero rather than leaving
    /// a stale value in place.
    pub fn reset(&self) {
        self.offset_ms.store(0, Ordering::Relaxed);
    }

    #[must_use]
    pub fn offset_ms(&self) -> i64 {
        self.offset_ms.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn time_syncs(&self) -> u32 {
        self.time_syncs.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn server_time_ms(&self) -> i64 {
        now_ms() + self.offset_ms()
    }

    /// True iff `ts >= 1483228800000` and `ts <= server_time() + 10000`.
    #[must_use]
    pub fn validate_timestamp(&self, ts: i64) -> bool {
        ts >= MIN_VALID_TIMESTAMP_MS && ts <= self.server_time_ms() + FUTURE_TOLERANCE_MS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_computes_midpoint_offset() {
        let sync = TimeSyncOffset::new();
        sync.record(1000, 1200, 51_200);
        assert_eq!(sync.offset_ms(), 51_200 - 1100);
        assert_eq!(sync.time_syncs(), 1);
    }

    #[test]
    fn boundary_timestamp_exactly_min_is_valid() {
        let sync = TimeSyncOffset::new();
        assert!(sync.validate_timestamp(MIN_VALID_TIMESTAMP_MS));
        assert!(!sync.validate_timestamp(MIN_VALID_TIMESTAMP_MS - 1));
    }

    #[test]
    fn boundary_timestamp_future_tolerance() {
        let sync = TimeSyncOffset::new();
        let boundary = sync.server_time_ms() + FUTURE_TOLERANCE_MS;
        assert!(sync.validate_timestamp(boundary));
        assert!(!sync.validate_timestamp(boundary + 1));
    }

    #[test]
    fn reset_zeroes_offset() {
        let sync = TimeSyncOffset::new();
        sync.record(0, 0, 5_000);
        assert_ne!(sync.offset_ms(), 0);
        sync.reset();
        assert_eq!(sync.offset_ms(), 0);
    }
}
