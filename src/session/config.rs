//! `SessionConfig`: tunables for one named HTTP session.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

/// TLS verification policy for a session or WebSocket connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SslPolicy {
    #[serde(default = "default_true")]
    pub verify: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SslPolicy {
    fn default() -> Self {
        Self { verify: true }
    }
}

/// Configuration for one named [`crate::session::Session`].
///
/// A value type: constructed once per session name and authoritative for the
/// lifetime of that session.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_total_timeout_ms")]
    pub total_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_per_host_limit")]
    pub per_host_connector_limit: usize,
    #[serde(default = "default_global_limit")]
    pub global_connector_limit: usize,
    #[serde(default = "default_keep_alive_ms")]
    pub keep_alive_ms: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_secs")]
    pub retry_base_delay_secs: f64,
    #[serde(default = "default_retry_backoff_multiplier")]
    pub retry_backoff_multiplier: f64,
    #[serde(default)]
    pub ssl: SslPolicy,
    #[serde(default)]
    pub static_headers: HashMap<String, String>,
    #[serde(default)]
    pub static_cookies: HashMap<String, String>,
    #[serde(default)]
    pub trust_environment: bool,
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    #[serde(default = "default_true")]
    pub auto_cleanup: bool,
    /// TTL after which an idle session is eligible for cleanup eviction.
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
}

const fn default_total_timeout_ms() -> u64 {
    30_000
}
const fn default_connect_timeout_ms() -> u64 {
    10_000
}
const fn default_read_timeout_ms() -> u64 {
    30_000
}
const fn default_per_host_limit() -> usize {
    10
}
const fn default_global_limit() -> usize {
    100
}
const fn default_keep_alive_ms() -> u64 {
    30_000
}
const fn default_retry_count() -> u32 {
    3
}
fn default_retry_base_delay_secs() -> f64 {
    0.5
}
fn default_retry_backoff_multiplier() -> f64 {
    2.0
}
const fn default_cleanup_interval_secs() -> u64 {
    60
}
const fn default_idle_ttl_secs() -> u64 {
    300
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            total_timeout_ms: default_total_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            per_host_connector_limit: default_per_host_limit(),
            global_connector_limit: default_global_limit(),
            keep_alive_ms: default_keep_alive_ms(),
            retry_count: default_retry_count(),
            retry_base_delay_secs: default_retry_base_delay_secs(),
            retry_backoff_multiplier: default_retry_backoff_multiplier(),
            ssl: SslPolicy::default(),
            static_headers: HashMap::new(),
            static_cookies: HashMap::new(),
            trust_environment: false,
            cleanup_interval_secs: default_cleanup_interval_secs(),
            auto_cleanup: true,
            idle_ttl_secs: default_idle_ttl_secs(),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn total_timeout(&self) -> Duration {
        Duration::from_millis(self.total_timeout_ms)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    #[must_use]
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let secs = self.retry_base_delay_secs * self.retry_backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(secs)
    }
}
