//! Gateway Session Port (Driven Port)
//!
//! The single brokerage session the process owns from start to finish.

use async_trait::async_trait;
use thiserror::Error;

/// Details of an established session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Account the session trades.
    pub account_id: String,
    /// Client id tagged on orders.
    pub client_id: u32,
}

/// Session error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Gateway unreachable.
    #[error("Gateway connection failure: {message}")]
    ConnectionFailure {
        /// Error details.
        message: String,
    },

    /// Gateway reachable but the brokerage session is not authenticated.
    #[error("Gateway not authenticated: {message}")]
    NotAuthenticated {
        /// Error details.
        message: String,
    },
}

/// Port for the brokerage session lifecycle.
#[async_trait]
pub trait GatewaySessionPort: Send + Sync {
    /// Establish the session.
    async fn connect(&self) -> Result<SessionInfo, SessionError>;

    /// Tear the session down. Safe to call when not connected.
    async fn disconnect(&self) -> Result<(), SessionError>;
}
