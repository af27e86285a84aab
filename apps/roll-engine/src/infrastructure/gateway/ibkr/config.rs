//! Client Portal gateway adapter configuration.

use std::time::Duration;

use crate::config::GatewayConfig;

/// Configuration for the Client Portal gateway adapter.
#[derive(Debug, Clone)]
pub struct IbkrConfig {
    /// Gateway host.
    pub host: String,
    /// Gateway port.
    pub port: u16,
    /// Account to trade; resolved from the session when empty.
    pub account_id: String,
    /// Client id tagged on order ids.
    pub client_id: u32,
    /// Routing exchange for quotes and orders.
    pub exchange: String,
    /// Accept the gateway's self-signed certificate.
    pub accept_invalid_certs: bool,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Retry policy configuration.
    pub retry: RetryConfig,
    base_url: Option<String>,
}

impl IbkrConfig {
    /// Create a configuration for a local gateway.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, client_id: u32) -> Self {
        Self {
            host: host.into(),
            port,
            account_id: String::new(),
            client_id,
            exchange: "SMART".to_string(),
            accept_invalid_certs: true,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            base_url: None,
        }
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry configuration.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Pin the account instead of using the session's first account.
    #[must_use]
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = account_id.into();
        self
    }

    /// Override the API base URL (plain HTTP gateways and test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// API base URL, `https://{host}:{port}/v1/api` unless overridden.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.base_url.as_ref().map_or_else(
            || format!("https://{}:{}/v1/api", self.host, self.port),
            |url| url.trim_end_matches('/').to_string(),
        )
    }
}

impl From<&GatewayConfig> for IbkrConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            account_id: config.account_id.clone(),
            client_id: config.client_id,
            exchange: config.exchange.clone(),
            accept_invalid_certs: config.accept_invalid_certs,
            timeout: Duration::from_secs(config.timeout_secs),
            retry: RetryConfig {
                max_attempts: config.retry.max_attempts,
                initial_backoff: Duration::from_millis(config.retry.initial_backoff_ms),
                max_backoff: Duration::from_millis(config.retry.max_backoff_ms),
                multiplier: config.retry.multiplier,
            },
            base_url: None,
        }
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts per request.
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_from_host_and_port() {
        let config = IbkrConfig::new("127.0.0.1", 5000, 123);
        assert_eq!(config.base_url(), "https://127.0.0.1:5000/v1/api");
    }

    #[test]
    fn base_url_override_trims_slash() {
        let config = IbkrConfig::new("127.0.0.1", 5000, 123).with_base_url("http://localhost:9/");
        assert_eq!(config.base_url(), "http://localhost:9");
    }

    #[test]
    fn from_gateway_config() {
        let gateway = GatewayConfig {
            account_id: "U42".to_string(),
            timeout_secs: 5,
            ..GatewayConfig::default()
        };
        let config = IbkrConfig::from(&gateway);
        assert_eq!(config.account_id, "U42");
        assert_eq!(config.client_id, 123);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.max_backoff, Duration::from_secs(10));
    }
}
