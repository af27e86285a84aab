//! Client Portal gateway error types.

use thiserror::Error;

use crate::application::ports::{ExecutionError, MarketDataError, SessionError};

/// Errors from the Client Portal gateway adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IbkrError {
    /// HTTP client could not be built or the request was malformed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// API returned an error.
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code.
        code: u16,
        /// Error message from the gateway.
        message: String,
    },

    /// The gateway is up but the brokerage session is not authenticated.
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    /// The session reports no trading account.
    #[error("No trading account available")]
    NoAccount,

    /// `connect` has not been called.
    #[error("Gateway session not connected")]
    NotConnected,

    /// The gateway does not know the requested instrument.
    #[error("Contract not found: {subject}")]
    ContractNotFound {
        /// What was looked up.
        subject: String,
    },

    /// Order was rejected.
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    /// Rate limited.
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Suggested retry delay in seconds.
        retry_after_secs: u64,
    },

    /// Network error (retryable).
    #[error("Network error: {0}")]
    Network(String),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(String),

    /// Max retries exceeded.
    #[error("Max retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Last HTTP status seen; `None` when the gateway never answered.
        status: Option<u16>,
    },
}

impl IbkrError {
    /// Whether the gateway itself is unreachable or unusable.
    #[must_use]
    pub const fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::Network(_)
                | Self::NotAuthenticated(_)
                | Self::NotConnected
                | Self::NoAccount
                | Self::Api { code: 401, .. }
                | Self::MaxRetriesExceeded { status: None, .. }
        )
    }
}

impl From<IbkrError> for MarketDataError {
    fn from(err: IbkrError) -> Self {
        if err.is_connection_failure() {
            return Self::ConnectionFailure {
                message: err.to_string(),
            };
        }
        match err {
            IbkrError::ContractNotFound { subject } => Self::DataUnavailable {
                subject,
                message: "not listed".to_string(),
            },
            IbkrError::Api { code: 404, message } => Self::DataUnavailable {
                subject: "request".to_string(),
                message,
            },
            IbkrError::RateLimited { .. } => Self::RateLimited,
            other => Self::Api {
                message: other.to_string(),
            },
        }
    }
}

impl From<IbkrError> for ExecutionError {
    fn from(err: IbkrError) -> Self {
        if err.is_connection_failure() {
            return Self::ConnectionFailure {
                message: err.to_string(),
            };
        }
        match err {
            IbkrError::OrderRejected(reason) => Self::OrderRejected { reason },
            IbkrError::RateLimited { .. } => Self::RateLimited,
            other => Self::Api {
                message: other.to_string(),
            },
        }
    }
}

impl From<IbkrError> for SessionError {
    fn from(err: IbkrError) -> Self {
        match err {
            IbkrError::NotAuthenticated(message) => Self::NotAuthenticated { message },
            other => Self::ConnectionFailure {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_error_is_connection_failure() {
        let err: MarketDataError = IbkrError::Network("connection refused".to_string()).into();
        assert!(matches!(err, MarketDataError::ConnectionFailure { .. }));

        let err: ExecutionError = IbkrError::Network("connection refused".to_string()).into();
        assert!(matches!(err, ExecutionError::ConnectionFailure { .. }));
    }

    #[test]
    fn unauthorized_is_connection_failure() {
        let err: ExecutionError = IbkrError::Api {
            code: 401,
            message: "not authenticated".to_string(),
        }
        .into();
        assert!(err.is_fatal());
    }

    #[test]
    fn retries_against_answering_server_are_not_fatal() {
        let err: MarketDataError = IbkrError::MaxRetriesExceeded {
            attempts: 3,
            status: Some(500),
        }
        .into();
        assert!(matches!(err, MarketDataError::Api { .. }));

        let err: MarketDataError = IbkrError::MaxRetriesExceeded {
            attempts: 3,
            status: None,
        }
        .into();
        assert!(err.is_fatal());
    }

    #[test]
    fn contract_not_found_is_data_unavailable() {
        let err: MarketDataError = IbkrError::ContractNotFound {
            subject: "MSTR 20250215 90 P".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            MarketDataError::DataUnavailable { ref subject, .. } if subject == "MSTR 20250215 90 P"
        ));
    }

    #[test]
    fn order_rejected_maps() {
        let err: ExecutionError = IbkrError::OrderRejected("price too far".to_string()).into();
        assert!(matches!(err, ExecutionError::OrderRejected { .. }));
    }

    #[test]
    fn rate_limited_maps() {
        let err: ExecutionError = IbkrError::RateLimited {
            retry_after_secs: 60,
        }
        .into();
        assert!(matches!(err, ExecutionError::RateLimited));
    }

    #[test]
    fn not_authenticated_session_error() {
        let err: SessionError = IbkrError::NotAuthenticated("competing session".to_string()).into();
        assert!(matches!(err, SessionError::NotAuthenticated { .. }));

        let err: SessionError = IbkrError::NoAccount.into();
        assert!(matches!(err, SessionError::ConnectionFailure { .. }));
    }
}
