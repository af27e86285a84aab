//! HTTP client wrapper with retry logic.

use std::time::Duration;

use rand::Rng;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::api_types::IbkrErrorResponse;
use super::config::{IbkrConfig, RetryConfig};
use super::error::IbkrError;

/// HTTP client for the Client Portal API with retry logic.
#[derive(Debug, Clone)]
pub struct IbkrHttpClient {
    client: Client,
    base_url: String,
    retry_config: RetryConfig,
}

impl IbkrHttpClient {
    /// Create a new HTTP client from config.
    pub fn new(config: &IbkrConfig) -> Result<Self, IbkrError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| IbkrError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            retry_config: config.retry.clone(),
        })
    }

    /// Make a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, IbkrError> {
        self.request(Method::GET, path, &[], None::<&()>).await
    }

    /// Make a GET request with query parameters.
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, IbkrError> {
        self.request(Method::GET, path, query, None::<&()>).await
    }

    /// Make a POST request with a JSON body.
    #[allow(clippy::future_not_send)]
    pub async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, IbkrError> {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    /// Internal request implementation with retry logic.
    #[allow(clippy::future_not_send)]
    async fn request<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T, IbkrError> {
        let url = format!("{}{path}", self.base_url);
        let mut backoff = ExponentialBackoff::new(&self.retry_config);
        let mut last_status = None;

        loop {
            let mut request = self.client.request(method.clone(), &url);
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(b) = body {
                request = request.json(b);
            }

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            error = %e,
                            %path,
                            delay_ms = delay.as_millis(),
                            attempt = backoff.attempt,
                            "Network error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    tracing::error!(error = %e, %path, "Gateway unreachable");
                    return Err(IbkrError::MaxRetriesExceeded {
                        attempts: backoff.attempt,
                        status: last_status,
                    });
                }
            };

            let status = response.status();

            if status.is_success() {
                let text = response
                    .text()
                    .await
                    .map_err(|e| IbkrError::Network(e.to_string()))?;
                if text.trim().is_empty() {
                    return serde_json::from_str("null")
                        .map_err(|e| IbkrError::JsonParse(e.to_string()));
                }
                return serde_json::from_str(&text).map_err(|e| {
                    IbkrError::JsonParse(format!("{path}: {e}"))
                });
            }

            last_status = Some(status.as_u16());

            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());

            let error_body = response.text().await.unwrap_or_default();
            let error_message = match serde_json::from_str::<IbkrErrorResponse>(&error_body) {
                Ok(err) => err.error,
                Err(_) => error_body,
            };

            match categorize_status(status) {
                ErrorCategory::RateLimited => {
                    let delay = retry_after
                        .map(Duration::from_secs)
                        .filter(|_| backoff.has_remaining_attempts())
                        .or_else(|| backoff.next_backoff());
                    if let Some(delay) = delay {
                        tracing::warn!(
                            %path,
                            delay_ms = delay.as_millis(),
                            "Rate limited, retrying"
                        );
                        backoff.attempt += u32::from(retry_after.is_some());
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(IbkrError::RateLimited {
                        retry_after_secs: retry_after.unwrap_or(60),
                    });
                }
                ErrorCategory::Retryable => {
                    if let Some(delay) = backoff.next_backoff() {
                        tracing::warn!(
                            code = status.as_u16(),
                            message = %error_message,
                            %path,
                            delay_ms = delay.as_millis(),
                            "Retryable error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(IbkrError::MaxRetriesExceeded {
                        attempts: backoff.attempt,
                        status: last_status,
                    });
                }
                ErrorCategory::NonRetryable => {
                    return match status {
                        StatusCode::UNAUTHORIZED => Err(IbkrError::NotAuthenticated(error_message)),
                        _ => Err(IbkrError::Api {
                            code: status.as_u16(),
                            message: error_message,
                        }),
                    };
                }
            }
        }
    }
}

/// Error category for determining retry behavior.
#[derive(Debug)]
enum ErrorCategory {
    RateLimited,
    Retryable,
    NonRetryable,
}

/// Categorize HTTP status code for retry handling.
const fn categorize_status(status: StatusCode) -> ErrorCategory {
    match status.as_u16() {
        429 => ErrorCategory::RateLimited,
        408 | 500 | 502 | 503 | 504 => ErrorCategory::Retryable,
        _ => ErrorCategory::NonRetryable,
    }
}

/// Exponential backoff with full jitter.
struct ExponentialBackoff {
    attempt: u32,
    max_attempts: u32,
    current_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
}

impl ExponentialBackoff {
    const fn new(config: &RetryConfig) -> Self {
        Self {
            attempt: 0,
            max_attempts: config.max_attempts,
            current_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            multiplier: config.multiplier,
        }
    }

    const fn has_remaining_attempts(&self) -> bool {
        self.attempt + 1 < self.max_attempts
    }

    /// Upper bound of the next delay, then advance.
    fn next_ceiling(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return None;
        }

        let ceiling = self.current_backoff;
        self.current_backoff = Duration::from_secs_f64(
            (self.current_backoff.as_secs_f64() * self.multiplier)
                .min(self.max_backoff.as_secs_f64()),
        );

        Some(ceiling)
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        let ceiling = self.next_ceiling()?.as_secs_f64();
        if ceiling <= 0.0 {
            return Some(Duration::ZERO);
        }
        // Full jitter: random value between 0 and the ceiling
        let jitter = rand::rng().random_range(0.0..ceiling);
        Some(Duration::from_secs_f64(jitter))
    }
}
