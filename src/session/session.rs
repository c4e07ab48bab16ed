//! `Session`: a named, pooled HTTP client with its applied configuration.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Client;

use crate::proxy::ProxyConfig;

use super::config::SessionConfig;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// A named HTTP session: one reusable `reqwest::Client` plus the config and
/// proxy it was built with.
///
/// Identified by name (the session map's keys are unique); reused while
/// open, evicted when closed or idle past its TTL.
pub struct Session {
    pub name: String,
    pub(crate) client: Client,
    pub config: SessionConfig,
    pub proxy: ProxyConfig,
    pub created_at_ms: i64,
    last_used_ms: AtomicI64,
    closed: AtomicBool,
}

impl Session {
    pub(crate) fn new(name: String, client: Client, config: SessionConfig, proxy: ProxyConfig) -> Self {
        let now = now_ms();
        Self {
            name,
            client,
            config,
            proxy,
            created_at_ms: now,
            last_used_ms: AtomicI64::new(now),
            closed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn last_used_ms(&self) -> i64 {
        self.last_used_ms.load(Ordering::Relaxed)
    }

    pub(crate) fn touch(&self) {
        self.last_used_ms.store(now_ms(), Ordering::Relaxed);
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn idle_for_ms(&self) -> i64 {
        now_ms() - self.last_used_ms()
    }

    #[must_use]
    pub fn is_idle_expired(&self) -> bool {
        self.idle_for_ms() >= (self.config.idle_ttl_secs as i64) * 1000
    }
}
