//! `SessionManager`: pools and reuses named HTTP clients.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use reqwest::{header, Client, ClientBuilder, Method, Response};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::proxy::ProxyConfig;

use super::config::SessionConfig;
use super::session::Session;

const DEFAULT_SESSION_NAME: &str = "default";

#[derive(Default)]
struct Counters {
    requests_sent: AtomicU64,
    requests_successful: AtomicU64,
    requests_failed: AtomicU64,
    proxy_requests: AtomicU64,
    direct_requests: AtomicU64,
    sessions_created: AtomicU64,
    sessions_closed: AtomicU64,
}

/// Aggregate counters exposed via [`SessionManager::stats`].
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub requests_sent: u64,
    pub requests_successful: u64,
    pub requests_failed: u64,
    pub proxy_requests: u64,
    pub direct_requests: u64,
    pub sessions_created: u64,
    pub sessions_closed: u64,
    pub open_sessions: u64,
}

/// Health report: a 0-100 score derived from success rate and the share of
/// closed-vs-active sessions, plus a status tag.
#[derive(Debug, Clone)]
pub struct SessionHealth {
    pub healthy: bool,
    pub score: u8,
    pub status: &'static str,
    pub stats: SessionStats,
}

/// Pools and reuses named HTTP clients, applying retries, proxying, and
/// lifecycle tracking uniformly across every caller in the process.
///
/// Sole owner of the session map: mutated only through this
/// type's methods.
pub struct SessionManager {
    sessions: DashMap<String, Arc<Session>>,
    default_config: SessionConfig,
    counters: Counters,
    closed: AtomicBool,
    cleanup_handle: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl SessionManager {
    #[must_use]
    pub fn new(default_config: SessionConfig) -> Arc<Self> {
        let manager = Arc::new(Self {
            sessions: DashMap::new(),
            default_config: default_config.clone(),
            counters: Counters::default(),
            closed: AtomicBool::new(false),
            cleanup_handle: parking_lot::Mutex::new(None),
        });

        if default_config.auto_cleanup {
            manager.clone().spawn_cleanup_loop(default_config.cleanup_interval_secs);
        }

        manager
    }

    fn spawn_cleanup_loop(self: Arc<Self>, interval_secs: u64) {
        let interval = Duration::from_secs(interval_secs.max(1));
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if self.closed.load(Ordering::Acquire) {
                    break;
                }
                self.cleanup_closed();
            }
        });
        *self.cleanup_handle.lock() = Some(handle);
    }

    /// Return an existing open session for `name`, or construct one.
    ///
    /// Configuration supplied on the first call for a name is authoritative;
    /// subsequent calls ignore re-supplied config unless the session was
    /// reconstructed via [`SessionManager::refresh`].
    pub fn get(
        &self,
        name: &str,
        config: Option<SessionConfig>,
        proxy: Option<ProxyConfig>,
    ) -> Result<Arc<Session>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed("session manager is closed".into()));
        }

        if let Some(existing) = self.sessions.get(name) {
            if !existing.is_closed() {
                return Ok(existing.clone());
            }
        }

        let config = config.unwrap_or_else(|| self.default_config.clone());
        let proxy = proxy.unwrap_or_default();
        let client = Self::build_client(&config, &proxy)?;
        let session = Arc::new(Session::new(name.to_string(), client, config, proxy));
        self.counters.sessions_created.fetch_add(1, Ordering::Relaxed);
        self.sessions.insert(name.to_string(), session.clone());
        Ok(session)
    }

    /// Build a `reqwest::Client` from config, degrading to a reduced option
    /// set if the full one fails to construct (mirrors runtime-incompatible
    /// flags being dropped on a transport library version mismatch).
    fn build_client(config: &SessionConfig, proxy: &ProxyConfig) -> Result<Client> {
        let full = Self::client_builder(config, proxy, true);
        match full.build() {
            Ok(client) => Ok(client),
            Err(e) => {
                warn!(error = %e, "full session client options rejected, degrading to reduced set");
                let reduced = Self::client_builder(config, proxy, false);
                reduced.build().map_err(Error::from)
            }
        }
    }

    fn client_builder(config: &SessionConfig, proxy: &ProxyConfig, include_extras: bool) -> ClientBuilder {
        let mut builder = Client::builder()
            .timeout(config.total_timeout())
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(config.per_host_connector_limit)
            .pool_idle_timeout(config.keep_alive())
            .danger_accept_invalid_certs(!config.ssl.verify);

        if include_extras {
            if !config.static_headers.is_empty() {
                let mut headers = header::HeaderMap::new();
                for (k, v) in &config.static_headers {
                    if let (Ok(name), Ok(value)) = (
                        header::HeaderName::from_bytes(k.as_bytes()),
                        header::HeaderValue::from_str(v),
                    ) {
                        headers.insert(name, value);
                    }
                }
                builder = builder.default_headers(headers);
            }
            builder = builder.cookie_store(!config.static_cookies.is_empty());
        }

        if let Some(url) = proxy.to_generic_url() {
            if let Ok(p) = reqwest::Proxy::all(url) {
                builder = builder.proxy(p);
            }
        }

        builder
    }

    /// Perform a request using the named session's client, applying its
    /// proxy unless `proxy_override` is set, and updating request counters.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        name: &str,
        proxy_override: Option<&ProxyConfig>,
    ) -> Result<Response> {
        let session = self.get(name, None, proxy_override.cloned())?;
        session.touch();

        self.counters.requests_sent.fetch_add(1, Ordering::Relaxed);
        if session.proxy.to_generic_url().is_some() {
            self.counters.proxy_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.direct_requests.fetch_add(1, Ordering::Relaxed);
        }

        let result = session.client().request(method, url).send().await;
        match result {
            Ok(resp) => {
                self.counters.requests_successful.fetch_add(1, Ordering::Relaxed);
                Ok(resp)
            }
            Err(e) => {
                self.counters.requests_failed.fetch_add(1, Ordering::Relaxed);
                Err(Error::from(e))
            }
        }
    }

    /// Like [`SessionManager::request`], retrying on transport error or
    /// HTTP >= 500 up to `retry_count` times, sleeping
    /// `retry_delay * backoff^attempt` between attempts. 4xx is never
    /// retried; any 5xx response body is dropped before retrying.
    pub async fn request_with_retry(
        &self,
        method: Method,
        url: &str,
        name: &str,
    ) -> Result<Response> {
        let session = self.get(name, None, None)?;
        let retry_count = session.config.retry_count;

        let mut attempt = 0;
        loop {
            let resp = self.request(method.clone(), url, name, None).await;
            match resp {
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() && attempt < retry_count {
                        drop(response);
                        let delay = session.config.retry_delay(attempt);
                        debug!(attempt, status = %status, ?delay, "retrying after server error");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) if attempt < retry_count => {
                    let delay = session.config.retry_delay(attempt);
                    debug!(attempt, error = %e, ?delay, "retrying after transport error");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Close and evict the named session. Close errors are swallowed with a
    /// warning.
    pub fn close(&self, name: &str) {
        if let Some((_, session)) = self.sessions.remove(name) {
            session.mark_closed();
            self.counters.sessions_closed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Close every open session and stop the cleanup task.
    pub fn close_all(&self) {
        self.closed.store(true, Ordering::Release);
        if let Some(handle) = self.cleanup_handle.lock().take() {
            handle.abort();
        }
        for entry in self.sessions.iter() {
            entry.value().mark_closed();
        }
        let closed = self.sessions.len() as u64;
        self.counters.sessions_closed.fetch_add(closed, Ordering::Relaxed);
        self.sessions.clear();
    }

    /// Close the named session now; the next [`SessionManager::get`] call
    /// reconstructs it from scratch.
    pub fn refresh(&self, name: &str) {
        self.close(name);
    }

    /// Remove any session whose handle reports closed or that has been idle
    /// past its configured TTL.
    pub fn cleanup_closed(&self) {
        let stale: Vec<String> = self
            .sessions
            .iter()
            .filter(|e| e.value().is_closed() || e.value().is_idle_expired())
            .map(|e| e.key().clone())
            .collect();
        for name in stale {
            self.sessions.remove(&name);
        }
    }

    #[must_use]
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            requests_sent: self.counters.requests_sent.load(Ordering::Relaxed),
            requests_successful: self.counters.requests_successful.load(Ordering::Relaxed),
            requests_failed: self.counters.requests_failed.load(Ordering::Relaxed),
            proxy_requests: self.counters.proxy_requests.load(Ordering::Relaxed),
            direct_requests: self.counters.direct_requests.load(Ordering::Relaxed),
            sessions_created: self.counters.sessions_created.load(Ordering::Relaxed),
            sessions_closed: self.counters.sessions_closed.load(Ordering::Relaxed),
            open_sessions: self.sessions.len() as u64,
        }
    }

    #[must_use]
    pub fn health(&self) -> SessionHealth {
        let stats = self.stats();
        if self.closed.load(Ordering::Acquire) {
            return SessionHealth {
                healthy: false,
                score: 0,
                status: "closed",
                stats,
            };
        }

        let total = stats.requests_sent.max(1) as f64;
        let success_rate = stats.requests_successful as f64 / total;

        let total_sessions = (stats.sessions_created).max(1) as f64;
        let closed_share = stats.sessions_closed as f64 / total_sessions;

        let score = ((success_rate * 0.7 + (1.0 - closed_share) * 0.3) * 100.0)
            .clamp(0.0, 100.0) as u8;

        let status = if score < 50 {
            "unhealthy"
        } else if score < 80 {
            "degraded"
        } else {
            "healthy"
        };

        SessionHealth {
            healthy: score >= 50,
            score,
            status,
            stats,
        }
    }
}

/// Name used when no explicit session name is supplied.
#[must_use]
pub const fn default_session_name() -> &'static str {
    DEFAULT_SESSION_NAME
}
