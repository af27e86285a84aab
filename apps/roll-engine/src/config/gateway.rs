//! Brokerage gateway configuration.

use serde::{Deserialize, Serialize};

/// Client Portal gateway connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway host.
    #[serde(default = "default_host")]
    pub host: String,
    /// Gateway port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Client id tagged on order ids.
    #[serde(default = "default_client_id")]
    pub client_id: u32,
    /// Account to trade; the first account the session reports when empty.
    #[serde(default)]
    pub account_id: String,
    /// Routing exchange for option quotes and orders.
    #[serde(default = "default_exchange")]
    pub exchange: String,
    /// Accept the gateway's self-signed certificate.
    #[serde(default = "default_true")]
    pub accept_invalid_certs: bool,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retry policy for transient HTTP failures.
    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_id: default_client_id(),
            account_id: String::new(),
            exchange: default_exchange(),
            accept_invalid_certs: true,
            timeout_secs: default_timeout_secs(),
            retry: RetrySettings::default(),
        }
    }
}

/// Retry policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Maximum attempts per request.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// First backoff in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Backoff cap in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Backoff growth factor.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
const fn default_port() -> u16 {
    5000
}
const fn default_client_id() -> u32 {
    123
}
fn default_exchange() -> String {
    "SMART".to_string()
}
const fn default_true() -> bool {
    true
}
const fn default_timeout_secs() -> u64 {
    30
}
const fn default_max_attempts() -> u32 {
    3
}
const fn default_initial_backoff_ms() -> u64 {
    100
}
const fn default_max_backoff_ms() -> u64 {
    10_000
}
const fn default_multiplier() -> f64 {
    2.0
}
