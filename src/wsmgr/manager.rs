//! `WebSocketManager`: opens, wraps, multiplexes, monitors, and reconnects
//! WebSocket connections across every venue and dialect this process talks
//! to, with proactive smooth handover before any connection's hard age
//! limit.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{client_async_tls_with_config, connect_async_tls_with_config, Connector};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::proxy::ProxyConfig;
use crate::session::SessionManager;
use crate::supervisor::FlowListener;

use super::backoff::{attempts_exhausted, reconnect_delay};
use super::config::WebSocketConfig;
use super::connection::Connection;
use super::dedup::{DedupFields, Deduper};
use super::reopener::Reopener;
use super::routing::{self, Dialect};
use super::subscription::{Subscription, SubscriptionCallback};
use super::wrapper::{TransportKind, WebSocketWrapper};

const REACTIVE_CHECK_INTERVAL: Duration = Duration::from_secs(30);
const REACTIVE_SILENCE_THRESHOLD: Duration = Duration::from_secs(5 * 60);
const PROACTIVE_POLL_INTERVAL: Duration = Duration::from_secs(30);
const SMOOTH_SYNC_WINDOW: Duration = Duration::from_secs(2);
const SMOOTH_DRAIN_WINDOW: Duration = Duration::from_secs(1);
const SUBSCRIBE_PACING: Duration = Duration::from_millis(100);

#[derive(Default)]
struct Counters {
    reconnections: AtomicU64,
    proactive_reconnections: AtomicU64,
    smooth_reconnections: AtomicU64,
    connection_failures: AtomicU64,
    duplicate_messages: AtomicU64,
    buffered_messages: AtomicU64,
    unrouted_messages: AtomicU64,
    routed_messages: AtomicU64,
    callback_errors: AtomicU64,
    pings_sent: AtomicU64,
    /// Shared with every open [`WebSocketWrapper`] so pongs observed deep in
    /// a wrapper's read loop land directly in this counter instead of
    /// waiting on a text frame to surface them.
    pongs_received: Arc<AtomicU64>,
    circuit_trips: AtomicU64,
}

/// Snapshot of the manager's counters.
#[derive(Debug, Clone, Default)]
pub struct WebSocketManagerStats {
    pub reconnections: u64,
    pub proactive_reconnections: u64,
    pub smooth_reconnections: u64,
    pub connection_failures: u64,
    pub duplicate_messages: u64,
    pub buffered_messages: u64,
    pub unrouted_messages: u64,
    pub routed_messages: u64,
    pub callback_errors: u64,
    pub pings_sent: u64,
    pub pongs_received: u64,
    pub circuit_trips: u64,
    pub open_connections: usize,
}

/// Opens, wraps, multiplexes, monitors, and reconnects WebSocket
/// connections. Sole owner of connection state: the connection
/// map, buffer map, and stash map are all reachable only through
/// [`Connection`] values owned here.
pub struct WebSocketManager {
    connections: DashMap<String, Arc<Connection>>,
    wrapper_cache: DashMap<String, Arc<WebSocketWrapper>>,
    dedup: Arc<Deduper>,
    counters: Counters,
    session_manager: Arc<SessionManager>,
    listener: parking_lot::Mutex<Option<Arc<dyn FlowListener>>>,
}

impl WebSocketManager {
    #[must_use]
    pub fn new(session_manager: Arc<SessionManager>) -> Arc<Self> {
        Arc::new(Self {
            connections: DashMap::new(),
            wrapper_cache: DashMap::new(),
            dedup: Arc::new(Deduper::new()),
            counters: Counters::default(),
            session_manager,
            listener: parking_lot::Mutex::new(None),
        })
    }

    /// Register the Flow Supervisor as the listener for update/error
    /// events. Optional: a manager with no listener simply doesn't report.
    pub fn set_listener(&self, listener: Arc<dyn FlowListener>) {
        *self.listener.lock() = Some(listener);
    }

    fn notify_update(&self, venue: &str, market: &str, symbol: &str) {
        if let Some(listener) = self.listener.lock().as_ref() {
            listener.record_update(venue, market, symbol);
        }
    }

    fn notify_error(&self, venue: &str, market: &str, symbol: &str) {
        if let Some(listener) = self.listener.lock().as_ref() {
            listener.record_error(venue, market, symbol);
        }
    }

    // ---- Opening -----------------------------------------------------

    /// Open a connection: proxy-tunneled path preferred when a proxy is
    /// configured, otherwise a direct connection. Returns `None` (never an
    /// error) on total failure, leaving the caller to react.
    async fn open_wrapper(
        &self,
        config: &WebSocketConfig,
        proxy: &ProxyConfig,
    ) -> Option<Arc<WebSocketWrapper>> {
        let cache_key = format!("{}_{}", config.venue, config.url);

        if let Some(existing) = self.wrapper_cache.get(&cache_key) {
            if !existing.is_closed() {
                return Some(existing.clone());
            }
            drop(existing);
            self.wrapper_cache.remove(&cache_key);
        }

        let verify = config.effective_ssl_verify();

        if proxy.to_generic_url().is_some() {
            match self.open_via_proxy_tunnel(config, proxy, verify).await {
                Ok(wrapper) => {
                    let wrapper = Arc::new(wrapper);
                    self.wrapper_cache.insert(cache_key, wrapper.clone());
                    return Some(wrapper);
                }
                Err(e) => {
                    warn!(error = %e, venue = %config.venue, "proxy-tunneled open failed, falling back to direct");
                }
            }
        }

        match self.open_direct(config, verify).await {
            Ok(wrapper) => {
                let wrapper = Arc::new(wrapper);
                self.wrapper_cache.insert(cache_key, wrapper.clone());
                Some(wrapper)
            }
            Err(e) => {
                warn!(error = %e, venue = %config.venue, "direct open failed");
                self.counters.connection_failures.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    async fn open_direct(
        &self,
        config: &WebSocketConfig,
        verify: bool,
    ) -> Result<WebSocketWrapper> {
        let request = config.url.as_str().into_client_request()?;
        let connector = tls_connector(verify);
        let (stream, response) = tokio::time::timeout(
            config.handshake_timeout(),
            connect_async_tls_with_config(request, None, false, connector),
        )
        .await
        .map_err(|_| crate::error::Error::Transport("websocket handshake timed out".into()))??;
        debug!(status = %response.status(), venue = %config.venue, verify, "direct websocket open");
        Ok(WebSocketWrapper::new(
            stream,
            None,
            TransportKind::Direct,
            self.counters.pongs_received.clone(),
        ))
    }

    async fn open_via_proxy_tunnel(
        &self,
        config: &WebSocketConfig,
        proxy: &ProxyConfig,
        verify: bool,
    ) -> Result<WebSocketWrapper> {
        let proxy_url = proxy
            .to_generic_url()
            .ok_or_else(|| crate::error::Error::Transport("no proxy configured".into()))?;

        let session = self.session_manager.get(&config.venue, None, Some(proxy.clone()))?;

        let proxy_parsed = url::Url::parse(proxy_url)?;
        let proxy_host = proxy_parsed
            .host_str()
            .ok_or_else(|| crate::error::Error::Transport("proxy url missing host".into()))?;
        let proxy_port = proxy_parsed.port().unwrap_or(1080);

        let target = url::Url::parse(&config.url)?;
        let target_host = target
            .host_str()
            .ok_or_else(|| crate::error::Error::Transport("target url missing host".into()))?;
        let target_port = target.port_or_known_default().unwrap_or(443);

        let tcp = TcpStream::connect((proxy_host, proxy_port)).await?;
        let tcp = tunnel_connect(tcp, target_host, target_port).await?;

        let request = config.url.as_str().into_client_request()?;
        let connector = tls_connector(verify);
        let (stream, response) = tokio::time::timeout(
            config.handshake_timeout(),
            client_async_tls_with_config(request, tcp, None, connector),
        )
        .await
        .map_err(|_| crate::error::Error::Transport("websocket handshake timed out".into()))??;
        debug!(status = %response.status(), venue = %config.venue, verify, "proxy-tunneled websocket open");
        Ok(WebSocketWrapper::new(
            stream,
            Some(session),
            TransportKind::ProxyTunneled,
            self.counters.pongs_received.clone(),
        ))
    }

    // ---- Subscription and connection lifecycle ------------------------

    /// Open a new connection under a fresh id and start its background
    /// tasks. Returns `None` on open failure.
    pub async fn open_connection(
        self: &Arc<Self>,
        config: WebSocketConfig,
        proxy: ProxyConfig,
        dialect: Dialect,
    ) -> Option<String> {
        let wrapper = self.open_wrapper(&config, &proxy).await?;
        let id = Uuid::new_v4().to_string();
        let connection = Arc::new(Connection::new(
            id.clone(),
            config.clone(),
            dialect,
            wrapper,
            config.buffer_size,
        ));
        self.connections.insert(id.clone(), connection.clone());
        self.spawn_connection_tasks(connection, proxy);
        Some(id)
    }

    fn spawn_connection_tasks(self: &Arc<Self>, connection: Arc<Connection>, proxy: ProxyConfig) {
        let pump = {
            let manager = self.clone();
            let connection = connection.clone();
            tokio::spawn(async move { manager.message_pump(connection).await })
        };
        connection.register_task(pump);

        let supervisor = {
            let manager = self.clone();
            let connection = connection.clone();
            let proxy = proxy.clone();
            tokio::spawn(async move { manager.reactive_supervisor_loop(connection, proxy).await })
        };
        connection.register_task(supervisor);

        if connection.config.dual_connection_enabled {
            let manager = self.clone();
            let connection = connection.clone();
            let proxy = proxy.clone();
            let proactive =
                tokio::spawn(async move { manager.proactive_loop(connection, proxy).await });
            connection.register_task(proactive);
        }

        if requires_application_ping(&connection.dialect) {
            let manager = self.clone();
            let connection = connection.clone();
            let ping = tokio::spawn(async move { manager.application_ping_loop(connection).await });
            connection.register_task(ping);
        }
    }

    async fn message_pump(self: Arc<Self>, connection: Arc<Connection>) {
        loop {
            let wrapper = connection.current_wrapper().await;
            let Some(text) = wrapper.recv().await else {
                debug!(connection_id = %connection.id, "message pump: connection closed");
                return;
            };
            connection.touch();
            self.route_incoming(&connection, &text).await;
        }
    }

    async fn application_ping_loop(self: Arc<Self>, connection: Arc<Connection>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(25));
        loop {
            ticker.tick().await;
            let wrapper = connection.current_wrapper().await;
            if wrapper.is_closed() {
                return;
            }
            if wrapper.send("ping").await.is_ok() {
                self.counters.pings_sent.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Send a raw text frame over a connection's current wrapper. Used by
    /// callers outside the subscription path, e.g. a Venue Connector's
    /// private-channel login control message.
    pub async fn send_raw(&self, connection_id: &str, text: &str) -> Result<()> {
        let connection = self
            .connections
            .get(connection_id)
            .ok_or_else(|| {
                crate::error::Error::Closed(format!("no connection for id={connection_id}"))
            })?
            .clone();
        let wrapper = connection.current_wrapper().await;
        wrapper.send(text).await
    }

    /// Register a subscription callback against a connection.
    pub fn subscribe(
        &self,
        connection_id: &str,
        data_type: super::routing::DataType,
        symbols: HashSet<String>,
        callback: SubscriptionCallback,
        venue: String,
        market: String,
    ) -> bool {
        let Some(connection) = self.connections.get(connection_id) else {
            return false;
        };
        let sub = Arc::new(Subscription::new(venue, market, data_type, symbols, callback));
        sub.mark_active(connection_id.to_string());
        connection.subscriptions.insert(Uuid::new_v4(), sub);
        true
    }

    /// Update timestamp, consult stash, dedup, buffer,
    /// parse, dispatch.
    async fn route_incoming(&self, connection: &Arc<Connection>, raw_text: &str) {
        if connection.stash.is_active() {
            if let Ok(value) = serde_json::from_str::<Value>(raw_text) {
                connection.stash.enqueue(value);
                self.counters.buffered_messages.fetch_add(1, Ordering::Relaxed);
            }
            return;
        }

        self.dispatch_raw(connection, raw_text).await;
    }

    /// Shared by live routing and stash drain: dedup, buffer, parse,
    /// dispatch to matching subscriptions.
    async fn dispatch_raw(&self, connection: &Arc<Connection>, raw_text: &str) {
        let Ok(value) = serde_json::from_str::<Value>(raw_text) else {
            self.counters.unrouted_messages.fetch_add(1, Ordering::Relaxed);
            return;
        };

        let parsed = routing::parse(connection.dialect, &value);
        let Some(parsed) = parsed else {
            self.counters.unrouted_messages.fetch_add(1, Ordering::Relaxed);
            return;
        };

        let dedup_fields = DedupFields {
            symbol: &parsed.symbol,
            event_time: value.get("E").and_then(Value::as_i64),
            timestamp: value.get("T").and_then(Value::as_i64),
            price: value.get("p").and_then(Value::as_str),
        };
        if self.dedup.is_duplicate(&dedup_fields) {
            self.counters.duplicate_messages.fetch_add(1, Ordering::Relaxed);
            return;
        }

        connection.buffer.push(super::buffer::BufferedMessage {
            timestamp_ms: super::connection::now_ms(),
            message: value.clone(),
            sequence: None,
        });

        let mut dispatched = false;
        for entry in connection.subscriptions.iter() {
            let sub = entry.value();
            if sub.is_active()
                && sub.data_type == parsed.data_type
                && sub.contains_symbol(&parsed.symbol)
            {
                dispatched = true;
                let cb = sub.callback.clone();
                let payload = parsed.payload.clone();
                let symbol = parsed.symbol.clone();
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    cb(&symbol, &payload);
                }));
                if result.is_err() {
                    self.counters.callback_errors.fetch_add(1, Ordering::Relaxed);
                    error!(venue = %sub.venue, symbol = %symbol, "subscription callback panicked");
                    self.notify_error(&sub.venue, &sub.market, &symbol);
                } else {
                    self.notify_update(&sub.venue, &sub.market, &symbol);
                }
            }
        }

        if dispatched {
            self.counters.routed_messages.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.unrouted_messages.fetch_add(1, Ordering::Relaxed);
        }
    }

    // ---- Reactive reconnection -----------------------------------------

    async fn reactive_supervisor_loop(self: Arc<Self>, connection: Arc<Connection>, proxy: ProxyConfig) {
        let mut ticker = tokio::time::interval(REACTIVE_CHECK_INTERVAL);
        loop {
            ticker.tick().await;
            if !self.connections.contains_key(&connection.id) {
                return;
            }
            let wrapper = connection.current_wrapper().await;
            let unhealthy = wrapper.is_closed()
                || connection.seconds_since_last_message() > REACTIVE_SILENCE_THRESHOLD.as_secs_f64();

            if unhealthy && connection.config.auto_reconnect {
                self.reactive_reconnect(&connection, &proxy).await;
            }
        }
    }

    async fn reactive_reconnect(&self, connection: &Arc<Connection>, proxy: &ProxyConfig) {
        loop {
            if !connection.circuit.allows() {
                let remaining = connection
                    .circuit
                    .remaining_cooldown()
                    .unwrap_or(connection.config.circuit_breaker_cooldown());
                warn!(
                    connection_id = %connection.id,
                    remaining_secs = remaining.as_secs(),
                    "circuit breaker open, waiting for cooldown before reconnecting"
                );
                tokio::time::sleep(remaining).await;
                continue;
            }

            let attempt = connection.reconnect_attempt.load(Ordering::Relaxed);
            if attempts_exhausted(attempt, connection.config.max_reconnect_attempts) {
                error!(connection_id = %connection.id, "reconnect attempts exhausted");
                return;
            }

            let delay = reconnect_delay(
                connection.config.initial_reconnect_delay(),
                connection.config.backoff_multiplier,
                connection.config.max_reconnect_delay(),
                attempt,
            );
            tokio::time::sleep(delay).await;

            match self.open_wrapper(&connection.config, proxy).await {
                Some(wrapper) => {
                    connection.swap_wrapper(wrapper).await;
                    connection.touch();
                    connection.reconnect_attempt.store(0, Ordering::Relaxed);
                    connection.circuit.record_success();
                    self.counters.reconnections.fetch_add(1, Ordering::Relaxed);
                    self.restore_subscriptions(connection).await;
                    info!(connection_id = %connection.id, attempt, "reactive reconnect succeeded");
                    return;
                }
                None => {
                    connection.reconnect_attempt.fetch_add(1, Ordering::Relaxed);
                    self.counters.connection_failures.fetch_add(1, Ordering::Relaxed);
                    if connection.circuit.record_failure() {
                        self.counters.circuit_trips.fetch_add(1, Ordering::Relaxed);
                        error!(connection_id = %connection.id, attempt, "circuit breaker tripped, pausing reconnection attempts");
                    } else {
                        warn!(connection_id = %connection.id, attempt, "reactive reconnect attempt failed");
                    }
                }
            }
        }
    }

    // ---- Proactive smooth handover -------------------------------------

    async fn proactive_loop(self: Arc<Self>, connection: Arc<Connection>, proxy: ProxyConfig) {
        let mut ticker = tokio::time::interval(PROACTIVE_POLL_INTERVAL);
        loop {
            ticker.tick().await;
            if !self.connections.contains_key(&connection.id) {
                return;
            }
            if connection.open_duration_secs()
                >= connection.config.proactive_reconnect_threshold_secs
            {
                if let Err(e) = self.smooth_reconnect(&connection, &proxy).await {
                    warn!(connection_id = %connection.id, error = %e, "smooth reconnect failed, falling back to reactive policy");
                }
            }
        }
    }

    /// Stash on, open replacement, restore subscriptions,
    /// swap, drain stash, close old handle.
    async fn smooth_reconnect(&self, connection: &Arc<Connection>, proxy: &ProxyConfig) -> Result<()> {
        connection.stash.start();

        let new_wrapper = match self.open_wrapper(&connection.config, proxy).await {
            Some(w) => w,
            None => {
                // Leave the stash off and keep the original connection.
                let _ = connection.stash.stop();
                return Err(crate::error::Error::Transport(
                    "failed to open replacement connection for smooth handover".into(),
                ));
            }
        };

        tokio::time::sleep(SMOOTH_SYNC_WINDOW).await;

        self.restore_subscriptions_on(connection, &new_wrapper).await;

        let old_wrapper = connection.swap_wrapper(new_wrapper).await;
        self.counters.smooth_reconnections.fetch_add(1, Ordering::Relaxed);
        self.counters.proactive_reconnections.fetch_add(1, Ordering::Relaxed);

        let drained = connection.stash.stop();
        for message in drained {
            let raw = message.to_string();
            self.dispatch_raw(connection, &raw).await;
        }

        tokio::time::sleep(SMOOTH_DRAIN_WINDOW).await;
        old_wrapper.close().await;

        connection.reset_open_at();
        connection.touch();
        Ok(())
    }

    // ---- Subscription restoration ---------------------------------------

    async fn restore_subscriptions(&self, connection: &Arc<Connection>) {
        let wrapper = connection.current_wrapper().await;
        self.restore_subscriptions_on(connection, &wrapper).await;
    }

    async fn restore_subscriptions_on(&self, connection: &Arc<Connection>, wrapper: &Arc<WebSocketWrapper>) {
        match connection.dialect {
            Dialect::CombinedStream => {
                // Subscription is encoded in the URL; a fresh open already
                // restores it — nothing further to send.
            }
            Dialect::ChannelArg => {
                for entry in connection.subscriptions.iter() {
                    let sub = entry.value();
                    for symbol in sub.symbols() {
                        let op = serde_json::json!({
                            "op": "subscribe",
                            "args": [{"channel": channel_for(sub.data_type), "instId": symbol}],
                        });
                        if let Err(e) = wrapper.send(&op.to_string()).await {
                            warn!(error = %e, "failed to resend subscribe op during restoration");
                        }
                        tokio::time::sleep(SUBSCRIBE_PACING).await;
                    }
                }
            }
        }
    }

    // ---- Close semantics --------------------------------------------------

    /// Idempotent: cancels both supervisor tasks, closes the wrapper
    /// (ignoring errors), and removes per-connection state. The global
    /// dedup scope is not cleared.
    pub async fn close_connection(&self, id: &str) {
        let Some((_, connection)) = self.connections.remove(id) else {
            return;
        };
        connection.abort_tasks();
        connection.current_wrapper().await.close().await;
    }

    pub async fn close_all(&self) {
        let ids: Vec<String> = self.connections.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.close_connection(&id).await;
        }
        self.session_manager.close_all();
    }

    #[must_use]
    pub fn stats(&self) -> WebSocketManagerStats {
        WebSocketManagerStats {
            reconnections: self.counters.reconnections.load(Ordering::Relaxed),
            proactive_reconnections: self.counters.proactive_reconnections.load(Ordering::Relaxed),
            smooth_reconnections: self.counters.smooth_reconnections.load(Ordering::Relaxed),
            connection_failures: self.counters.connection_failures.load(Ordering::Relaxed),
            duplicate_messages: self.counters.duplicate_messages.load(Ordering::Relaxed),
            buffered_messages: self.counters.buffered_messages.load(Ordering::Relaxed),
            unrouted_messages: self.counters.unrouted_messages.load(Ordering::Relaxed),
            routed_messages: self.counters.routed_messages.load(Ordering::Relaxed),
            callback_errors: self.counters.callback_errors.load(Ordering::Relaxed),
            pings_sent: self.counters.pings_sent.load(Ordering::Relaxed),
            pongs_received: self.counters.pongs_received.load(Ordering::Relaxed),
            circuit_trips: self.counters.circuit_trips.load(Ordering::Relaxed),
            open_connections: self.connections.len(),
        }
    }
}

#[async_trait]
impl Reopener for WebSocketManager {
    async fn resubscribe(&self, venue: &str, market: &str, symbols: &[String]) -> Result<String> {
        // Recovery is venue/dialect-agnostic at this layer: the caller
        // (Venue Connector / Flow Supervisor integration) is expected to
        // have already registered the right WebSocketConfig for this
        // (venue, market); here we just report which connection currently
        // serves it, opening a fresh one only if none does.
        for entry in self.connections.iter() {
            if entry.value().config.venue == venue && entry.value().config.market == market {
                return Ok(entry.key().clone());
            }
        }
        warn!(venue, market, symbols = symbols.len(), "no existing connection to recover; caller must open one with venue-appropriate config");
        Err(crate::error::Error::Transport(format!(
            "no connection registered for venue={venue} market={market}"
        )))
    }
}

/// Certificate verifier that accepts anything, backing `ssl_verify=false`
/// and `ssl_verify_override_venues` (spec §4.3.1) on the WebSocket path the
/// same way `session::manager` honors it on the HTTP path via
/// `danger_accept_invalid_certs`.
#[derive(Debug)]
struct NoCertVerification;

impl ServerCertVerifier for NoCertVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        rustls::crypto::ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

fn insecure_rustls_config() -> Arc<ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .expect("ring provider supports the default TLS protocol versions")
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(NoCertVerification))
        .with_no_client_auth();
    Arc::new(config)
}

/// `None` keeps tokio-tungstenite's default verifying connector; `Some`
/// swaps in a no-verify rustls config when the venue has verification
/// disabled.
fn tls_connector(verify: bool) -> Option<Connector> {
    if verify {
        None
    } else {
        Some(Connector::Rustls(insecure_rustls_config()))
    }
}

fn requires_application_ping(dialect: &Dialect) -> bool {
    matches!(dialect, Dialect::ChannelArg)
}

fn channel_for(data_type: super::routing::DataType) -> &'static str {
    use super::routing::DataType;
    match data_type {
        DataType::Orderbook => "books",
        DataType::Trade => "trades",
        DataType::Kline => "candle1m",
        DataType::FundingRate => "funding-rate",
        DataType::OpenInterest => "open-interest",
        DataType::Liquidation => "liquidation-orders",
    }
}

async fn tunnel_connect(mut tcp: TcpStream, host: &str, port: u16) -> Result<TcpStream> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let request = format!(
        "CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\nProxy-Connection: Keep-Alive\r\n\r\n"
    );
    tcp.write_all(request.as_bytes()).await?;

    let mut buf = [0u8; 1024];
    let mut total = Vec::new();
    loop {
        let n = tcp.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        total.extend_from_slice(&buf[..n]);
        if total.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    let response = String::from_utf8_lossy(&total);
    if !response.starts_with("HTTP/1.1 200") && !response.starts_with("HTTP/1.0 200") {
        return Err(crate::error::Error::Transport(format!(
            "proxy CONNECT failed: {}",
            response.lines().next().unwrap_or("")
        )));
    }
    Ok(tcp)
}
