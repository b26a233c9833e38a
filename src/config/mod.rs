//! mediagate configuration
//!
//! Settings are layered, later layers winning:
//! 1. struct defaults
//! 2. `config/mediagate.toml`, or the file named by `MEDIAGATE_CONFIG`
//! 3. `.env` and process environment (`MEDIAGATE__<SECTION>__<KEY>`)
//!
//! ```no_run
//! use mediagate::config::Config;
//!
//! let config = Config::load().expect("configuration");
//! println!("upstream: {}", config.upstream.base_url);
//! ```
//!
//! Overrides look like:
//! - `MEDIAGATE__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `MEDIAGATE__RATE_LIMIT__MAX_REQUESTS=20`
//! - `MEDIAGATE__UPSTREAM__REQUEST_TIMEOUT=5s`
//!
//! Durations and sizes accept human-readable strings (`"10s"`, `"20MB"`).
//! Everything is validated after loading.

mod models;
mod sources;
mod validation;

pub use crate::humanize::{ByteSize, HumanDuration};
pub use models::{
    Config, ProxyConfig, RateLimitConfig, ServerConfig, TelemetryConfig, UpstreamConfig,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Defaults, then the configured TOML file, then `MEDIAGATE__*` env
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Same layering with an explicit file (`--config`, tests)
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
