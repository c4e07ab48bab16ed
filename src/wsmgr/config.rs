//! `WebSocketConfig`: per-connection tunables.

use std::time::Duration;

use serde::Deserialize;

fn default_true() -> bool {
    true
}

/// Configuration for one WebSocket connection.
#[derive(Debug, Clone, Deserialize)]
pub struct WebSocketConfig {
    pub url: String,
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub ssl_verify: bool,
    /// Venue names that must have SSL verification disabled regardless of
    /// `ssl_verify`, typically because they're only reachable through a
    /// proxy that terminates TLS itself.
    #[serde(default)]
    pub ssl_verify_override_venues: Vec<String>,
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    #[serde(default = "default_ping_timeout_secs")]
    pub ping_timeout_secs: u64,
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
    #[serde(default)]
    pub extra_headers: Vec<(String, String)>,
    #[serde(default)]
    pub subprotocols: Vec<String>,
    pub venue: String,
    pub market: String,
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,
    /// -1 means unbounded retries.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: i64,
    #[serde(default = "default_initial_reconnect_delay_ms")]
    pub initial_reconnect_delay_ms: u64,
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_hard_connection_lifetime_secs")]
    pub hard_connection_lifetime_secs: u64,
    #[serde(default = "default_proactive_reconnect_threshold_secs")]
    pub proactive_reconnect_threshold_secs: u64,
    #[serde(default = "default_true")]
    pub dual_connection_enabled: bool,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Consecutive reconnect failures before the circuit breaker trips.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    #[serde(default = "default_circuit_breaker_cooldown_secs")]
    pub circuit_breaker_cooldown_secs: u64,
}

const fn default_handshake_timeout_ms() -> u64 {
    10_000
}
const fn default_ping_interval_secs() -> u64 {
    20
}
const fn default_ping_timeout_secs() -> u64 {
    10
}
const fn default_max_frame_size() -> usize {
    16 * 1024 * 1024
}
const fn default_max_reconnect_attempts() -> i64 {
    -1
}
const fn default_initial_reconnect_delay_ms() -> u64 {
    1_000
}
const fn default_max_reconnect_delay_ms() -> u64 {
    60_000
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
const fn default_hard_connection_lifetime_secs() -> u64 {
    24 * 3600
}
const fn default_proactive_reconnect_threshold_secs() -> u64 {
    23 * 3600 + 55 * 60
}
const fn default_buffer_size() -> usize {
    1_000
}
const fn default_max_consecutive_failures() -> u32 {
    10
}
const fn default_circuit_breaker_cooldown_secs() -> u64 {
    60
}

impl WebSocketConfig {
    #[must_use]
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    #[must_use]
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    #[must_use]
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }

    #[must_use]
    pub fn hard_connection_lifetime(&self) -> Duration {
        Duration::from_secs(self.hard_connection_lifetime_secs)
    }

    #[must_use]
    pub fn proactive_reconnect_threshold(&self) -> Duration {
        Duration::from_secs(self.proactive_reconnect_threshold_secs)
    }

    #[must_use]
    pub fn initial_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.initial_reconnect_delay_ms)
    }

    #[must_use]
    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_delay_ms)
    }

    #[must_use]
    pub fn circuit_breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.circuit_breaker_cooldown_secs)
    }

    /// SSL verification is off if either `ssl_verify=false` or this venue
    /// appears in the override list.
    #[must_use]
    pub fn effective_ssl_verify(&self) -> bool {
        self.ssl_verify
            && !self
                .ssl_verify_override_venues
                .iter()
                .any(|v| v == &self.venue)
    }
}
