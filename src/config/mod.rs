//! Configuration: TOML-backed settings with environment secret overrides,
//! plus logging initialization.

mod logging;
mod settings;

pub use logging::LoggingConfig;
pub use settings::{GovernorSettings, Settings};
