//! Configuration module for the roll engine.
//!
//! Loads a YAML file with environment variable interpolation and validates it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use roll_engine::config::load_config;
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Load from custom path
//! let config = load_config(Some("custom/config.yaml"))?;
//!
//! println!("gateway port: {}", config.gateway.port);
//! ```

mod archive;
mod gateway;
mod observability;
mod strategy;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use archive::ArchiveConfig;
pub use gateway::{GatewayConfig, RetrySettings};
pub use observability::{LogFormat, LoggingConfig, ObservabilityConfig};
pub use strategy::StrategyConfig;

use crate::domain::rolling::{EarningsCalendar, validate_target_delta};
use crate::domain::shared::Symbol;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Underlying whose puts are sold and archived.
    #[serde(default = "default_symbol")]
    pub symbol: Symbol,
    /// Known earnings dates (sorted and deduplicated on load).
    #[serde(default = "default_earnings_dates")]
    pub earnings_dates: EarningsCalendar,
    /// Roll strategy parameters.
    #[serde(default)]
    pub strategy: StrategyConfig,
    /// EOD archive settings.
    #[serde(default)]
    pub archive: ArchiveConfig,
    /// Gateway connection settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            earnings_dates: default_earnings_dates(),
            strategy: StrategyConfig::default(),
            archive: ArchiveConfig::default(),
            gateway: GatewayConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

fn default_symbol() -> Symbol {
    Symbol::new("MSTR")
}

fn default_earnings_dates() -> EarningsCalendar {
    EarningsCalendar::new(
        [(2025, 1, 16), (2025, 4, 17)]
            .into_iter()
            .filter_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
    )
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Regex is compile-time constant; expect() is safe here
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
///
/// # Errors
///
/// Returns `ValidationError` naming the first offending key.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    config
        .symbol
        .validate()
        .map_err(|e| ConfigError::ValidationError(format!("symbol: {e}")))?;

    validate_target_delta(config.strategy.target_delta)
        .map_err(|e| ConfigError::ValidationError(format!("strategy.{e}")))?;

    config
        .strategy
        .policy()
        .validate()
        .map_err(|e| ConfigError::ValidationError(format!("strategy: {e}")))?;

    if config.gateway.host.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "gateway.host must not be empty".to_string(),
        ));
    }

    if config.gateway.port == 0 {
        return Err(ConfigError::ValidationError(
            "gateway.port must be non-zero".to_string(),
        ));
    }

    if config.gateway.retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "gateway.retry.max_attempts must be at least 1".to_string(),
        ));
    }

    if config.gateway.retry.multiplier < 1.0 {
        return Err(ConfigError::ValidationError(
            "gateway.retry.multiplier must be at least 1.0".to_string(),
        ));
    }

    if config.archive.path.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "archive.path must not be empty".to_string(),
        ));
    }

    if config.archive.rights.is_empty() {
        return Err(ConfigError::ValidationError(
            "archive.rights must list at least one right".to_string(),
        ));
    }

    if config.archive.lookback_years == 0 {
        return Err(ConfigError::ValidationError(
            "archive.lookback_years must be at least 1".to_string(),
        ));
    }

    Ok(())
}
