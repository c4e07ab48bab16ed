//! Per-exchange configuration recognized by the Venue Connector.

use std::time::Duration;

use serde::Deserialize;

use crate::proxy::ProxyConfig;

fn default_price_precision() -> u32 {
    8
}
fn default_quantity_precision() -> u32 {
    8
}
fn default_rate_limit_requests() -> usize {
    1200
}
fn default_rate_limit_window_secs() -> u64 {
    60
}
fn default_ws_ping_interval_secs() -> u64 {
    20
}
fn default_ws_ping_timeout_secs() -> u64 {
    10
}

/// Exchange-scoped configuration: REST/WS endpoints, credentials,
/// precision, rate limits, and an optional nested proxy block.
#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
    pub name: String,
    pub base_url: String,
    pub ws_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default)]
    pub passphrase: Option<String>,
    #[serde(default = "default_price_precision")]
    pub price_precision: u32,
    #[serde(default = "default_quantity_precision")]
    pub quantity_precision: u32,
    #[serde(default = "default_rate_limit_requests")]
    pub rate_limit_requests: usize,
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
    #[serde(default)]
    pub http_proxy: Option<String>,
    #[serde(default)]
    pub ws_proxy: Option<String>,
    #[serde(default = "default_ws_ping_interval_secs")]
    pub ws_ping_interval_secs: u64,
    #[serde(default = "default_ws_ping_timeout_secs")]
    pub ws_ping_timeout_secs: u64,
    #[serde(default)]
    pub disable_ssl_for_exchanges: Vec<String>,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub rest_api: Option<RestApiProxyConfig>,
}

/// Nested `rest_api.http_proxy`/`https_proxy` override block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestApiProxyConfig {
    #[serde(default)]
    pub http_proxy: Option<String>,
    #[serde(default)]
    pub https_proxy: Option<String>,
}

impl VenueConfig {
    #[must_use]
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    #[must_use]
    pub fn ws_ping_interval(&self) -> Duration {
        Duration::from_secs(self.ws_ping_interval_secs)
    }

    #[must_use]
    pub fn ws_ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ws_ping_timeout_secs)
    }

    /// Build the effective proxy for this venue: the nested `proxy` block,
    /// else a synthesized one from `http_proxy`/`rest_api`.
    #[must_use]
    pub fn proxy_config(&self) -> ProxyConfig {
        if let Some(p) = &self.proxy {
            return p.clone();
        }
        let http = self
            .http_proxy
            .clone()
            .or_else(|| self.rest_api.as_ref().and_then(|r| r.http_proxy.clone()));
        let https = self
            .rest_api
            .as_ref()
            .and_then(|r| r.https_proxy.clone());
        ProxyConfig {
            http_proxy: http,
            https_proxy: https,
            ..Default::default()
        }
    }
}
