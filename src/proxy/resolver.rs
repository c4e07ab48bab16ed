//! Proxy resolution with layered precedence: exchange > service > environment.
//!
//! The first source that defines *any* field wins atomically; sources are
//! never merged across precedence levels. Resolution results
//! are cached by a fingerprint of the winning source so that repeated
//! `resolve` calls on the hot connection-open path don't re-parse env vars.

use std::collections::HashMap;
use std::env;

use parking_lot::Mutex;
use url::Url;

use super::config::ProxyConfig;

const SCHEMES: [&str; 4] = ["http", "https", "socks4", "socks5"];

/// Resolves the effective [`ProxyConfig`] for a connection attempt from
/// layered configuration sources, with a fingerprint-keyed hot-path cache.
pub struct ProxyResolver {
    cache: Mutex<HashMap<u64, ProxyConfig>>,
}

impl Default for ProxyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyResolver {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the effective proxy configuration.
    ///
    /// Precedence (highest first): `exchange_config` → `service_config` →
    /// process environment. The first source with any field set is returned
    /// whole; lower-precedence sources are not consulted at all once a
    /// higher one is defined.
    pub fn resolve(
        &self,
        exchange_config: Option<&ProxyConfig>,
        service_config: Option<&ProxyConfig>,
    ) -> ProxyConfig {
        let chosen = if let Some(cfg) = exchange_config.filter(|c| !c.is_empty()) {
            cfg.clone()
        } else if let Some(cfg) = service_config.filter(|c| !c.is_empty()) {
            cfg.clone()
        } else {
            Self::from_environment()
        };

        let fp = chosen.fingerprint();
        let mut cache = self.cache.lock();
        cache.entry(fp).or_insert_with(|| chosen.clone());
        chosen
    }

    /// Build a `ProxyConfig` purely from process environment variables,
    /// case-insensitively: `http_proxy`/`HTTP_PROXY`, `https_proxy`/
    /// `HTTPS_PROXY`, `socks4_proxy`/`SOCKS4_PROXY`, `socks5_proxy`/
    /// `SOCKS5_PROXY`, `no_proxy`/`NO_PROXY` (comma-separated).
    fn from_environment() -> ProxyConfig {
        let lookup = |lower: &str, upper: &str| -> Option<String> {
            env::var(lower).ok().or_else(|| env::var(upper).ok())
        };

        let no_proxy = lookup("no_proxy", "NO_PROXY")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        ProxyConfig {
            http_proxy: lookup("http_proxy", "HTTP_PROXY"),
            https_proxy: lookup("https_proxy", "HTTPS_PROXY"),
            socks4_proxy: lookup("socks4_proxy", "SOCKS4_PROXY"),
            socks5_proxy: lookup("socks5_proxy", "SOCKS5_PROXY"),
            no_proxy,
            enabled: true,
        }
    }

    /// Validate a proxy URL: scheme must be one of http/https/socks4/socks5,
    /// host must be present, and the port (if any) must be in range. No
    /// network probe is performed.
    #[must_use]
    pub fn validate(url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        if !SCHEMES.contains(&parsed.scheme()) {
            return false;
        }
        if parsed.host_str().is_none() {
            return false;
        }
        // `Url::port` already rejects out-of-range values at parse time, but
        // a malformed explicit port (e.g. `:999999`) fails parsing above.
        true
    }

    /// Unified URL for a generic connector that only accepts one proxy:
    /// HTTP family preferred over SOCKS family.
    #[must_use]
    pub fn to_generic_url(config: &ProxyConfig) -> Option<&str> {
        config.to_generic_url()
    }

    /// True if `url`'s host matches (or is a dot-suffix of) any token in
    /// `config.no_proxy`.
    #[must_use]
    pub fn should_bypass(url: &str, config: &ProxyConfig) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        config.no_proxy.iter().any(|token| {
            let token = token.trim_start_matches('.');
            host == token || host.ends_with(&format!(".{token}"))
        })
    }

    /// Invalidate the entire resolution cache, e.g. after a reconfiguration.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    // Environment variable tests must not run concurrently with each other.
    static ENV_LOCK: StdMutex<()> = StdMutex::new(());

    fn clear_proxy_env() {
        for key in [
            "http_proxy",
            "HTTP_PROXY",
            "https_proxy",
            "HTTPS_PROXY",
            "socks4_proxy",
            "SOCKS4_PROXY",
            "socks5_proxy",
            "SOCKS5_PROXY",
            "no_proxy",
            "NO_PROXY",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn precedence_exchange_beats_service_beats_env() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_proxy_env();
        env::set_var("http_proxy", "http://env:1");

        let resolver = ProxyResolver::new();
        let service = ProxyConfig {
            http_proxy: Some("http://svc:2".into()),
            ..Default::default()
        };
        let exchange = ProxyConfig {
            http_proxy: Some("http://ex:3".into()),
            ..Default::default()
        };

        let resolved = resolver.resolve(Some(&exchange), Some(&service));
        assert_eq!(resolved.http_proxy.as_deref(), Some("http://ex:3"));

        let resolved = resolver.resolve(None, Some(&service));
        assert_eq!(resolved.http_proxy.as_deref(), Some("http://svc:2"));

        let resolved = resolver.resolve(None, None);
        assert_eq!(resolved.http_proxy.as_deref(), Some("http://env:1"));

        clear_proxy_env();
    }

    #[test]
    fn validate_rejects_unknown_scheme() {
        assert!(!ProxyResolver::validate("ftp://host:21"));
        assert!(ProxyResolver::validate("socks5://host:1080"));
    }

    #[test]
    fn validate_rejects_missing_host() {
        assert!(!ProxyResolver::validate("http://"));
    }

    #[test]
    fn bypass_matches_exact_and_suffix() {
        let config = ProxyConfig {
            no_proxy: vec!["internal.example.com".into(), "corp.net".into()],
            ..Default::default()
        };
        assert!(ProxyResolver::should_bypass(
            "https://internal.example.com/x",
            &config
        ));
        assert!(ProxyResolver::should_bypass(
            "https://api.corp.net/x",
            &config
        ));
        assert!(!ProxyResolver::should_bypass(
            "https://other.com/x",
            &config
        ));
    }

    #[test]
    fn resolve_is_deterministic_given_identical_inputs() {
        let resolver = ProxyResolver::new();
        let exchange = ProxyConfig {
            http_proxy: Some("http://a:1".into()),
            ..Default::default()
        };
        let a = resolver.resolve(Some(&exchange), None);
        let b = resolver.resolve(Some(&exchange), None);
        assert_eq!(a, b);
    }
}
