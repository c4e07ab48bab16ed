//! Crate-wide error and severity taxonomy.
//!
//! Mirrors the structured error tags described for the connection layer:
//! configuration mistakes are caller bugs, transport failures are transient,
//! venue errors carry a classification that downstream code can act on
//! automatically (time resync, backoff, precision retry).

use std::fmt;

use thiserror::Error;

/// Severity attached to a classified venue error.
///
/// Drives automatic remediation: `Critical` triggers a time resync before the
/// error is raised to the caller, `Warning` with `RateLimitWait` triggers
/// client-side backoff. Nothing here is retried silently beyond the
/// HTTP 5xx retry already implemented by the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Critical,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Remediation hint attached to a classified venue error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AdjustPrecision,
    SyncTimeSignature,
    RateLimitWait,
    None,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AdjustPrecision => "adjust_precision",
            Self::SyncTimeSignature => "sync_time_signature",
            Self::RateLimitWait => "rate_limit_wait",
            Self::None => "none",
        };
        f.write_str(s)
    }
}

/// A classified venue-API error: an HTTP/WS response the venue returned with
/// a `{code, msg}` body that the per-venue error table was able to map to a
/// known tag.
#[derive(Debug, Clone)]
pub struct VenueError {
    /// Venue-specific numeric or string error code.
    pub code: String,
    /// Venue-provided human-readable message.
    pub message: String,
    /// Tag assigned by the venue's classification table (e.g. `RATE_LIMITED`).
    pub tag: String,
    pub severity: Severity,
    pub action: Action,
}

impl fmt::Display for VenueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "venue error {} ({}): {} [{}/{}]",
            self.code, self.tag, self.message, self.severity, self.action
        )
    }
}

impl std::error::Error for VenueError {}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Venue(VenueError),

    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: f64 },

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("operation attempted on a closed resource: {0}")]
    Closed(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}

impl From<VenueError> for Error {
    fn from(e: VenueError) -> Self {
        if e.action == Action::RateLimitWait {
            return Self::RateLimited {
                retry_after_secs: 1.0,
            };
        }
        Self::Venue(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
