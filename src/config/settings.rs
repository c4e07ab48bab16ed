//! Top-level `Settings`: loads TOML, layers environment overrides for
//! secrets, and aggregates every subsystem's configuration section. Reads a
//! TOML file into a typed struct, then lets a small set of environment
//! variables override secret fields so credentials never need to sit in a
//! checked-in file.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::config::LoggingConfig;
use crate::error::ConfigError;
use crate::governor::MemoryThresholds;
use crate::proxy::ProxyConfig;
use crate::session::SessionConfig;
use crate::venue::VenueConfig;
use crate::wsmgr::WebSocketConfig;

/// Resource governor thresholds, expressed in the same units as the rest of
/// the config file (MB instead of raw bytes).
#[derive(Debug, Clone, Deserialize)]
pub struct GovernorSettings {
    #[serde(default = "default_rss_ceiling_mb")]
    pub rss_ceiling_mb: u64,
    #[serde(default = "default_system_percent_ceiling")]
    pub system_percent_ceiling: f64,
    #[serde(default = "default_cpu_percent_ceiling")]
    pub cpu_percent_ceiling: f64,
    #[serde(default = "default_pool_utilization_fraction")]
    pub pool_utilization_fraction: f64,
}

fn default_rss_ceiling_mb() -> u64 {
    2048
}
fn default_system_percent_ceiling() -> f64 {
    90.0
}
fn default_cpu_percent_ceiling() -> f64 {
    90.0
}
fn default_pool_utilization_fraction() -> f64 {
    0.9
}

impl Default for GovernorSettings {
    fn default() -> Self {
        Self {
            rss_ceiling_mb: default_rss_ceiling_mb(),
            system_percent_ceiling: default_system_percent_ceiling(),
            cpu_percent_ceiling: default_cpu_percent_ceiling(),
            pool_utilization_fraction: default_pool_utilization_fraction(),
        }
    }
}

impl From<&GovernorSettings> for MemoryThresholds {
    fn from(settings: &GovernorSettings) -> Self {
        Self {
            rss_bytes_ceiling: settings.rss_ceiling_mb * 1024 * 1024,
            system_percent_ceiling: settings.system_percent_ceiling,
            cpu_percent_ceiling: settings.cpu_percent_ceiling,
            pool_utilization_fraction: settings.pool_utilization_fraction,
        }
    }
}

/// Root configuration document: one `[session]` section, a service-wide
/// `[proxy]` block, per-venue `[[venue]]` tables, and the ambient
/// `[logging]`/`[governor]` sections.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub governor: GovernorSettings,
    #[serde(default)]
    pub venue: Vec<VenueConfig>,
    #[serde(default)]
    pub websocket: Vec<WebSocketConfig>,
}

impl Settings {
    /// Load and parse a TOML file, then apply environment secret overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(ConfigError::ReadFile)?;
        let mut settings: Settings = toml::from_str(&contents)?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Overlay per-venue secrets from the environment: `{VENUE}_API_KEY`,
    /// `{VENUE}_API_SECRET`, `{VENUE}_PASSPHRASE` (venue name upper-cased,
    /// non-alphanumeric replaced with `_`), so credentials never need to
    /// live in the checked-in TOML file.
    fn apply_env_overrides(&mut self) {
        for venue in &mut self.venue {
            let prefix = env_prefix(&venue.name);
            if let Ok(key) = std::env::var(format!("{prefix}_API_KEY")) {
                venue.api_key = Some(key);
            }
            if let Ok(secret) = std::env::var(format!("{prefix}_API_SECRET")) {
                venue.api_secret = Some(secret);
            }
            if let Ok(passphrase) = std::env::var(format!("{prefix}_PASSPHRASE")) {
                venue.passphrase = Some(passphrase);
            }
        }
    }
}

fn env_prefix(venue_name: &str) -> String {
    venue_name
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_minimal_toml_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [[venue]]
            name = "binance"
            base_url = "https://api.binance.com"
            ws_url = "wss://stream.binance.com:9443"
            "#
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.venue.len(), 1);
        assert_eq!(settings.venue[0].price_precision, 8);
        assert_eq!(settings.governor.rss_ceiling_mb, 2048);
    }

    #[test]
    fn env_override_wins_over_file_secret() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [[venue]]
            name = "OKX Spot"
            base_url = "https://okx.example"
            ws_url = "wss://okx.example/ws"
            api_key = "from-file"
            "#
        )
        .unwrap();

        std::env::set_var("OKX_SPOT_API_KEY", "from-env");
        let settings = Settings::load(file.path()).unwrap();
        std::env::remove_var("OKX_SPOT_API_KEY");

        assert_eq!(settings.venue[0].api_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let result = Settings::load("/nonexistent/path/settings.toml");
        assert!(matches!(result, Err(ConfigError::ReadFile(_))));
    }
}
