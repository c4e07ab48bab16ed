//! Venue Connector: a per-venue facade over the Session Manager and
//! WebSocket Manager, owning a rate limiter, a clock offset, and a
//! dispatch table of its own WebSocket subscriptions. Config-driven, so the
//! same connector shape serves any venue speaking one of the supported wire
//! dialects.

pub mod config;
pub mod dialect;
mod errors;
mod precision;
mod rate_limiter;
mod signing;
mod time_sync;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex as SyncMutex;
use reqwest::Method;
use serde_json::Value;
use tracing::warn;

pub use config::VenueConfig;
pub use errors::classify;
pub use precision::{adjust_precision, prepare_params};
pub use rate_limiter::RateLimiter;
pub use signing::sign;
pub use time_sync::TimeSyncOffset;

use crate::error::{Error, Result};
use crate::session::SessionManager;
use crate::wsmgr::{Dialect, SubscriptionCallback, WebSocketConfig, WebSocketManager};

/// Aggregate counters and status exposed via [`VenueConnector::stats`].
#[derive(Debug, Clone, Default)]
pub struct VenueStats {
    pub requests_sent: u64,
    pub requests_successful: u64,
    pub requests_failed: u64,
    pub precision_adjustments: u64,
    pub time_syncs: u32,
    pub failed_logins: u32,
    pub is_authenticated: bool,
    pub ws_connected: bool,
    pub subscription_count: usize,
    pub server_offset_ms: i64,
    pub uptime_secs: u64,
}

/// A per-venue facade over the shared Session Manager and WebSocket
/// Manager. Holds only non-owning references to both.
pub struct VenueConnector {
    config: VenueConfig,
    session_manager: Arc<SessionManager>,
    wsmgr: Arc<WebSocketManager>,
    rate_limiter: RateLimiter,
    time_sync: TimeSyncOffset,
    connected: AtomicBool,
    is_authenticated: AtomicBool,
    consecutive_failures: AtomicU32,
    failed_logins: AtomicU32,
    requests_sent: AtomicU64,
    requests_successful: AtomicU64,
    requests_failed: AtomicU64,
    precision_adjustments: AtomicU64,
    started_at: Instant,
    ws_connection_id: SyncMutex<Option<String>>,
    subscriptions: SyncMutex<HashMap<String, SubscriptionCallback>>,
}

impl VenueConnector {
    #[must_use]
    pub fn new(
        config: VenueConfig,
        session_manager: Arc<SessionManager>,
        wsmgr: Arc<WebSocketManager>,
    ) -> Arc<Self> {
        let rate_limiter = RateLimiter::new(config.rate_limit_requests, config.rate_limit_window());
        Arc::new(Self {
            config,
            session_manager,
            wsmgr,
            rate_limiter,
            time_sync: TimeSyncOffset::new(),
            connected: AtomicBool::new(false),
            is_authenticated: AtomicBool::new(false),
            consecutive_failures: AtomicU32::new(0),
            failed_logins: AtomicU32::new(0),
            requests_sent: AtomicU64::new(0),
            requests_successful: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            precision_adjustments: AtomicU64::new(0),
            started_at: Instant::now(),
            ws_connection_id: SyncMutex::new(None),
            subscriptions: SyncMutex::new(HashMap::new()),
        })
    }

    // ---- Initialization and clock -------------------------------------

    pub async fn initialize(&self) -> Result<()> {
        self.sync_server_time().await;
        self.test_connectivity().await?;
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    /// Compute and store the offset via `(t_send + t_recv) / 2` against the
    /// venue's reported server time. Silent failure resets the offset to 0.
    pub async fn sync_server_time(&self) {
        let t_send = now_ms();
        match self.request(Method::GET, "/api/v3/time", None, false).await {
            Ok(body) => {
                let t_recv = now_ms();
                if let Some(venue_time) = body.get("serverTime").and_then(Value::as_i64) {
                    self.time_sync.record(t_send, t_recv, venue_time);
                } else {
                    warn!(venue = %self.config.name, "server time response missing serverTime field");
                    self.time_sync.reset();
                }
            }
            Err(e) => {
                warn!(venue = %self.config.name, error = %e, "time sync failed, resetting offset");
                self.time_sync.reset();
            }
        }
    }

    pub async fn test_connectivity(&self) -> Result<()> {
        self.request(Method::GET, "/api/v3/ping", None, false).await?;
        Ok(())
    }

    #[must_use]
    pub fn server_time(&self) -> i64 {
        self.time_sync.server_time_ms()
    }

    #[must_use]
    pub fn validate_timestamp(&self, ts: i64) -> bool {
        self.time_sync.validate_timestamp(ts)
    }

    // ---- Precision and signing -----------------------------------------

    #[must_use]
    pub fn adjust_price_or_quantity(&self, value: rust_decimal::Decimal, is_price: bool) -> String {
        self.precision_adjustments.fetch_add(1, Ordering::Relaxed);
        let digits = if is_price {
            self.config.price_precision
        } else {
            self.config.quantity_precision
        };
        adjust_precision(value, digits)
    }

    #[must_use]
    pub fn prepare_request_params(&self, params: &HashMap<String, Value>) -> HashMap<String, String> {
        prepare_params(params, self.config.price_precision, self.config.quantity_precision)
    }

    #[must_use]
    pub fn sign_params(&self, params: &HashMap<String, String>) -> String {
        let secret = self.config.api_secret.as_deref().unwrap_or("");
        let query = signing::canonical_query_string(params);
        sign(&query, secret)
    }

    // ---- REST requests ---------------------------------------------------

    /// Rate-gate, prepare params, optionally sign and stamp, dispatch, and
    /// classify non-2xx bodies into typed errors.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        params: Option<&HashMap<String, Value>>,
        signed: bool,
    ) -> Result<Value> {
        self.rate_limiter.acquire().await;

        let empty = HashMap::new();
        let mut prepared = self.prepare_request_params(params.unwrap_or(&empty));

        if signed {
            if !self.validate_timestamp(self.server_time()) {
                self.sync_server_time().await;
            }
            prepared.insert("timestamp".to_string(), self.server_time().to_string());
            let signature = self.sign_params(&prepared);
            prepared.insert("signature".to_string(), signature);
        }

        let query = signing::canonical_query_string(&prepared);
        let url = if query.is_empty() {
            format!("{}{endpoint}", self.config.base_url)
        } else {
            format!("{}{endpoint}?{query}", self.config.base_url)
        };

        self.requests_sent.fetch_add(1, Ordering::Relaxed);
        let response = self
            .session_manager
            .request_with_retry(method, &url, &self.config.name)
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                self.record_failure();
                self.requests_failed.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };

        let status = response.status();
        if status.as_u16() >= 400 {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let code = body.get("code").and_then(Value::as_i64).unwrap_or(0);
            let msg = body.get("msg").and_then(Value::as_str).unwrap_or("");
            let classified = classify(code, msg);
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
            self.record_failure();
            if classified.severity == crate::error::Severity::Critical {
                self.sync_server_time().await;
            }
            return Err(Error::from(classified));
        }

        let body: Value = response.json().await?;
        self.requests_successful.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
        Ok(body)
    }

    fn record_failure(&self) {
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// `min(300, 5 * 2^consecutive_failures)` seconds, reset on any success.
    #[must_use]
    pub fn backoff_delay(&self) -> Duration {
        let failures = self.consecutive_failures.load(Ordering::Relaxed);
        let secs = 5.0 * 2f64.powi(failures as i32);
        Duration::from_secs_f64(secs.min(300.0))
    }

    pub async fn get_ticker(&self, symbol: &str) -> Result<Value> {
        let mut params = HashMap::new();
        params.insert("symbol".to_string(), Value::String(symbol.to_string()));
        self.request(Method::GET, "/api/v3/ticker/price", Some(&params), false).await
    }

    pub async fn get_orderbook(&self, symbol: &str, limit: u32) -> Result<Value> {
        let mut params = HashMap::new();
        params.insert("symbol".to_string(), Value::String(symbol.to_string()));
        params.insert("limit".to_string(), Value::from(limit));
        self.request(Method::GET, "/api/v3/depth", Some(&params), false).await
    }

    pub async fn get_trades(&self, symbol: &str, limit: u32) -> Result<Value> {
        let mut params = HashMap::new();
        params.insert("symbol".to_string(), Value::String(symbol.to_string()));
        params.insert("limit".to_string(), Value::from(limit));
        self.request(Method::GET, "/api/v3/trades", Some(&params), false).await
    }

    // ---- WebSocket helpers ------------------------------------------------

    pub async fn connect_websocket(&self, streams: &[String], dialect: Dialect, market: &str) -> bool {
        let url = match dialect {
            Dialect::CombinedStream => {
                dialect::combined_stream::combined_stream_url(&self.config.ws_url, streams)
            }
            Dialect::ChannelArg => self.config.ws_url.clone(),
        };

        let ws_config = WebSocketConfig {
            url,
            handshake_timeout_ms: 10_000,
            ssl_verify: !self
                .config
                .disable_ssl_for_exchanges
                .contains(&self.config.name),
            ssl_verify_override_venues: self.config.disable_ssl_for_exchanges.clone(),
            ping_interval_secs: self.config.ws_ping_interval_secs,
            ping_timeout_secs: self.config.ws_ping_timeout_secs,
            max_frame_size: 16 * 1024 * 1024,
            extra_headers: Vec::new(),
            subprotocols: Vec::new(),
            venue: self.config.name.clone(),
            market: market.to_string(),
            auto_reconnect: true,
            max_reconnect_attempts: -1,
            initial_reconnect_delay_ms: 1_000,
            max_reconnect_delay_ms: 60_000,
            backoff_multiplier: 2.0,
            hard_connection_lifetime_secs: 24 * 3600,
            proactive_reconnect_threshold_secs: 23 * 3600 + 55 * 60,
            dual_connection_enabled: true,
            buffer_size: 1_000,
            max_consecutive_failures: 10,
            circuit_breaker_cooldown_secs: 60,
        };

        let proxy = self.config.proxy_config();
        match self.wsmgr.open_connection(ws_config, proxy, dialect).await {
            Some(id) => {
                *self.ws_connection_id.lock() = Some(id);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn subscribe(&self, stream: &str, handler: SubscriptionCallback) -> bool {
        self.subscriptions.lock().insert(stream.to_string(), handler);
        self.ws_connection_id.lock().is_some()
    }

    pub fn unsubscribe(&self, stream: &str) {
        self.subscriptions.lock().remove(stream);
    }

    pub async fn close_websocket(&self) {
        let id = self.ws_connection_id.lock().take();
        if let Some(id) = id {
            self.wsmgr.close_connection(&id).await;
        }
        self.subscriptions.lock().clear();
    }

    /// Build and send the login control message over this connector's
    /// private-channel connection. `is_authenticated` reflects whether the
    /// op was actually transmitted, not a server ack — the dialect has no
    /// login-response parsing wired into `dispatch_raw` yet.
    pub async fn login(&self) -> bool {
        let (api_key, secret) = match (&self.config.api_key, &self.config.api_secret) {
            (Some(k), Some(s)) => (k.clone(), s.clone()),
            _ => {
                self.failed_logins.fetch_add(1, Ordering::Relaxed);
                return false;
            }
        };
        let Some(connection_id) = self.ws_connection_id.lock().clone() else {
            self.failed_logins.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        let passphrase = self.config.passphrase.clone().unwrap_or_default();
        let timestamp = (now_ms() / 1000).to_string();
        let login_message =
            dialect::channel_arg::login_message(&api_key, &passphrase, &secret, &timestamp);
        match self.wsmgr.send_raw(&connection_id, &login_message.to_string()).await {
            Ok(()) => {
                self.is_authenticated.store(true, Ordering::Release);
                true
            }
            Err(e) => {
                warn!(venue = %self.config.name, error = %e, "login message send failed");
                self.failed_logins.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    #[must_use]
    pub fn stats(&self) -> VenueStats {
        VenueStats {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            requests_successful: self.requests_successful.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            precision_adjustments: self.precision_adjustments.load(Ordering::Relaxed),
            time_syncs: self.time_sync.time_syncs(),
            failed_logins: self.failed_logins.load(Ordering::Relaxed),
            is_authenticated: self.is_authenticated.load(Ordering::Acquire),
            ws_connected: self.ws_connection_id.lock().is_some(),
            subscription_count: self.subscriptions.lock().len(),
            server_offset_ms: self.time_sync.offset_ms(),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_delay_caps_at_300_and_grows_exponentially() {
        // Direct construction avoids needing live Session/WebSocket managers.
        let config = VenueConfig {
            name: "test".into(),
            base_url: "https://example.com".into(),
            ws_url: "wss://example.com/ws".into(),
            api_key: None,
            api_secret: None,
            passphrase: None,
            price_precision: 2,
            quantity_precision: 4,
            rate_limit_requests: 10,
            rate_limit_window_secs: 1,
            http_proxy: None,
            ws_proxy: None,
            ws_ping_interval_secs: 20,
            ws_ping_timeout_secs: 10,
            disable_ssl_for_exchanges: Vec::new(),
            proxy: None,
            rest_api: None,
        };
        let session_manager = SessionManager::new(crate::session::SessionConfig {
            auto_cleanup: false,
            ..Default::default()
        });
        let wsmgr = WebSocketManager::new(session_manager.clone());
        let connector = VenueConnector::new(config, session_manager, wsmgr);

        assert_eq!(connector.backoff_delay(), Duration::from_secs(5));
        connector.consecutive_failures.store(3, Ordering::Relaxed);
        assert_eq!(connector.backoff_delay(), Duration::from_secs(40));
        connector.consecutive_failures.store(10, Ordering::Relaxed);
        assert_eq!(connector.backoff_delay(), Duration::from_secs(300));
    }
}
