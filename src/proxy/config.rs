//! `ProxyConfig` value type: an effective, already-resolved proxy set.

use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// An effective proxy configuration for one connection attempt.
///
/// Immutable after construction. Two `ProxyConfig`s built from identical
/// inputs compare equal and fingerprint identically, which is what lets the
/// resolver cache safely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub http_proxy: Option<String>,
    #[serde(default)]
    pub https_proxy: Option<String>,
    #[serde(default)]
    pub socks4_proxy: Option<String>,
    #[serde(default)]
    pub socks5_proxy: Option<String>,
    #[serde(default)]
    pub no_proxy: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ProxyConfig {
    /// True if none of the scheme-specific URLs are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.http_proxy.is_none()
            && self.https_proxy.is_none()
            && self.socks4_proxy.is_none()
            && self.socks5_proxy.is_none()
    }

    /// Effective HTTP URL: HTTPS preferred over plain HTTP.
    #[must_use]
    pub fn effective_http_url(&self) -> Option<&str> {
        self.https_proxy
            .as_deref()
            .or(self.http_proxy.as_deref())
    }

    /// Effective SOCKS URL: SOCKS5 preferred over SOCKS4.
    #[must_use]
    pub fn effective_socks_url(&self) -> Option<&str> {
        self.socks5_proxy
            .as_deref()
            .or(self.socks4_proxy.as_deref())
    }

    /// A single unified URL suitable for a generic connector that only
    /// accepts one proxy: HTTP family preferred over SOCKS family.
    #[must_use]
    pub fn to_generic_url(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.effective_http_url().or_else(|| self.effective_socks_url())
    }

    /// Stable fingerprint over this config's contents, used as a cache key
    /// by the resolver. Two configs with identical fields fingerprint
    /// identically regardless of construction order.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.http_proxy.hash(&mut hasher);
        self.https_proxy.hash(&mut hasher);
        self.socks4_proxy.hash(&mut hasher);
        self.socks5_proxy.hash(&mut hasher);
        let mut bypass = self.no_proxy.clone();
        bypass.sort();
        bypass.hash(&mut hasher);
        self.enabled.hash(&mut hasher);
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_http_prefers_https() {
        let cfg = ProxyConfig {
            http_proxy: Some("http://a:1".into()),
            https_proxy: Some("http://b:2".into()),
            ..Default::default()
        };
        assert_eq!(cfg.effective_http_url(), Some("http://b:2"));
    }

    #[test]
    fn effective_socks_prefers_v5() {
        let cfg = ProxyConfig {
            socks4_proxy: Some("socks4://a:1".into()),
            socks5_proxy: Some("socks5://b:2".into()),
            ..Default::default()
        };
        assert_eq!(cfg.effective_socks_url(), Some("socks5://b:2"));
    }

    #[test]
    fn generic_url_prefers_http_family_over_socks() {
        let cfg = ProxyConfig {
            socks5_proxy: Some("socks5://b:2".into()),
            http_proxy: Some("http://a:1".into()),
            ..Default::default()
        };
        assert_eq!(cfg.to_generic_url(), Some("http://a:1"));
    }

    #[test]
    fn disabled_proxy_yields_no_generic_url() {
        let cfg = ProxyConfig {
            http_proxy: Some("http://a:1".into()),
            enabled: false,
            ..Default::default()
        };
        assert_eq!(cfg.to_generic_url(), None);
    }

    #[test]
    fn fingerprint_is_order_independent_over_bypass_list() {
        let a = ProxyConfig {
            no_proxy: vec!["a".into(), "b".into()],
            ..Default::default()
        };
        let b = ProxyConfig {
            no_proxy: vec!["b".into(), "a".into()],
            ..Default::default()
        };
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
