//! Library-agnostic `WebSocketWrapper`: a uniform view over the two
//! underlying transport shapes a connection can be opened with (proxy-
//! tunneled, session-owned vs. direct, standalone).
//!
//! Normalizes frame handling: only decoded text reaches the iterator,
//! control frames are consumed transparently, and close is signaled purely
//! by iterator termination. Held and reused across venues rather than
//! consumed by a one-shot `run()` loop.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::session::Session;

/// Which path a wrapper was opened through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Tunneled through a proxy via an HTTP CONNECT, session-owned so the
    /// HTTP session's headers/cookies can be reused for the handshake.
    ProxyTunneled,
    /// Opened directly against the venue, no owning session.
    Direct,
}

/// A single WebSocket connection, normalized to `send` / async-iterate /
/// `close`.
pub struct WebSocketWrapper {
    stream: tokio::sync::Mutex<Option<WebSocketStream<MaybeTlsStream<TcpStream>>>>,
    owning_session: Option<Arc<Session>>,
    transport: TransportKind,
    closed: AtomicBool,
    /// Shared with the owning manager's counters so pongs consumed deep in
    /// `recv`'s read loop are visible without waiting for a text frame.
    pongs_received: Arc<AtomicU64>,
}

impl WebSocketWrapper {
    #[must_use]
    pub fn new(
        stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
        owning_session: Option<Arc<Session>>,
        transport: TransportKind,
        pongs_received: Arc<AtomicU64>,
    ) -> Self {
        Self {
            stream: tokio::sync::Mutex::new(Some(stream)),
            owning_session,
            transport,
            closed: AtomicBool::new(false),
            pongs_received,
        }
    }

    #[must_use]
    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Send a text frame. Fails if the wrapper is closed.
    pub async fn send(&self, text: &str) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed("websocket wrapper is closed".into()));
        }
        let mut guard = self.stream.lock().await;
        match guard.as_mut() {
            Some(stream) => stream
                .send(Message::Text(text.to_string()))
                .await
                .map_err(Error::from),
            None => Err(Error::Closed("websocket wrapper is closed".into())),
        }
    }

    /// Read the next decoded text frame, consuming and skipping non-text
    /// frames (pings, pongs, binary decoded as UTF-8, etc.) until one
    /// arrives or the connection ends.
    ///
    /// Returns `None` on remote close, local close, or a terminal error —
    /// iterator termination is the wrapper's only close signal.
    pub async fn recv(&self) -> Option<String> {
        loop {
            if self.is_closed() {
                return None;
            }
            let mut guard = self.stream.lock().await;
            let Some(stream) = guard.as_mut() else {
                return None;
            };

            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(text),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(text),
                    Err(e) => {
                        warn!(error = %e, "dropping non-utf8 binary frame");
                        continue;
                    }
                },
                Some(Ok(Message::Pong(_))) => {
                    self.pongs_received.fetch_add(1, Ordering::Relaxed);
                    trace!("received pong");
                    continue;
                }
                Some(Ok(Message::Ping(_) | Message::Frame(_))) => {
                    trace!("consumed control frame");
                    continue;
                }
                Some(Ok(Message::Close(_))) | None => {
                    drop(guard);
                    self.closed.store(true, Ordering::Release);
                    return None;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "websocket read error, treating as close");
                    drop(guard);
                    self.closed.store(true, Ordering::Release);
                    return None;
                }
            }
        }
    }

    /// Idempotent close. Errors closing the underlying stream are
    /// swallowed; the owning session (if any) is released.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut guard = self.stream.lock().await;
        if let Some(mut stream) = guard.take() {
            if let Err(e) = stream.close(None).await {
                trace!(error = %e, "error closing websocket (ignored)");
            }
        }
    }
}

impl Drop for WebSocketWrapper {
    fn drop(&mut self) {
        // owning_session's Arc is simply released here; the session itself
        // is untouched (the manager decides session lifecycle).
        let _ = &self.owning_session;
    }
}
