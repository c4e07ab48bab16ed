//! Per-connection state: the live wrapper, its buffer/stash/subscriptions,
//! and the handles for its three background tasks (message pump, reactive
//! supervisor, proactive handover).

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::circuit::CircuitBreaker;
use super::config::WebSocketConfig;
use super::routing::Dialect;
use super::stash::ReconnectionStash;
use super::subscription::Subscription;
use super::wrapper::WebSocketWrapper;
use crate::wsmgr::buffer::CircularBuffer;

pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// One logical connection: a public, stable `id` backed by a swappable
/// [`WebSocketWrapper`] (swapped during a smooth handover, §4.3.6).
pub struct Connection {
    pub id: String,
    pub config: WebSocketConfig,
    pub dialect: Dialect,
    pub(crate) wrapper: AsyncMutex<Arc<WebSocketWrapper>>,
    pub buffer: CircularBuffer,
    pub stash: ReconnectionStash,
    pub subscriptions: DashMap<Uuid, Arc<Subscription>>,
    last_message_ms: AtomicI64,
    open_at_ms: AtomicI64,
    pub(crate) reconnect_attempt: AtomicU32,
    pub(crate) circuit: CircuitBreaker,
    pub(crate) tasks: SyncMutex<Vec<JoinHandle<()>>>,
}

impl Connection {
    pub(crate) fn new(
        id: String,
        config: WebSocketConfig,
        dialect: Dialect,
        wrapper: Arc<WebSocketWrapper>,
        buffer_size: usize,
    ) -> Self {
        let now = now_ms();
        let circuit = CircuitBreaker::new(
            config.max_consecutive_failures,
            config.circuit_breaker_cooldown(),
        );
        Self {
            id,
            config,
            dialect,
            wrapper: AsyncMutex::new(wrapper),
            buffer: CircularBuffer::new(buffer_size),
            stash: ReconnectionStash::default(),
            subscriptions: DashMap::new(),
            last_message_ms: AtomicI64::new(now),
            open_at_ms: AtomicI64::new(now),
            reconnect_attempt: AtomicU32::new(0),
            circuit,
            tasks: SyncMutex::new(Vec::new()),
        }
    }

    pub fn touch(&self) {
        self.last_message_ms.store(now_ms(), Ordering::Relaxed);
    }

    #[must_use]
    pub fn last_message_ms(&self) -> i64 {
        self.last_message_ms.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn seconds_since_last_message(&self) -> f64 {
        (now_ms() - self.last_message_ms()) as f64 / 1000.0
    }

    #[must_use]
    pub fn open_duration_secs(&self) -> u64 {
        ((now_ms() - self.open_at_ms.load(Ordering::Relaxed)).max(0) / 1000) as u64
    }

    pub fn reset_open_at(&self) {
        self.open_at_ms.store(now_ms(), Ordering::Relaxed);
    }

    pub async fn current_wrapper(&self) -> Arc<WebSocketWrapper> {
        self.wrapper.lock().await.clone()
    }

    pub async fn swap_wrapper(&self, new_wrapper: Arc<WebSocketWrapper>) -> Arc<WebSocketWrapper> {
        let mut guard = self.wrapper.lock().await;
        std::mem::replace(&mut *guard, new_wrapper)
    }

    pub fn abort_tasks(&self) {
        for handle in self.tasks.lock().drain(..) {
            handle.abort();
        }
    }

    pub fn register_task(&self, handle: JoinHandle<()>) {
        self.tasks.lock().push(handle);
    }
}
