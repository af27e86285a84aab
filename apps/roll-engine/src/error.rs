//! Engine-level errors.
//!
//! | Variant | Effect |
//! |---------|--------|
//! | `ConnectionFailure` | Fatal to the run; the session is still disconnected |
//! | `DataUnavailable` | The affected roll or contract is skipped |
//! | `PartialRollFailure` | Closes confirmed, replacement not opened; exit non-zero |
//! | `Cancelled` | Shutdown requested mid-run |
//! | others | Abort the current roll only |

use thiserror::Error;

use crate::application::ports::{ArchiveError, ExecutionError, MarketDataError, SessionError};
use crate::application::services::StrikeSelectionError;
use crate::config::ConfigError;
use crate::domain::rolling::{RollEvent, RollKind};
use crate::domain::shared::DomainError;

/// Errors surfaced by the use cases.
#[derive(Debug, Error)]
pub enum RollEngineError {
    /// Gateway unreachable or session lost.
    #[error("Connection failure: {message}")]
    ConnectionFailure {
        /// Error details.
        message: String,
    },

    /// Market data missing for the request.
    #[error("Data unavailable for {subject}: {message}")]
    DataUnavailable {
        /// What was requested.
        subject: String,
        /// Error details.
        message: String,
    },

    /// At least one close was confirmed but the sequence could not finish.
    #[error("{kind} partially failed after {} confirmed close(s): {reason}", closed.len())]
    PartialRollFailure {
        /// Roll cadence.
        kind: RollKind,
        /// Confirmed closing orders.
        closed: Vec<RollEvent>,
        /// What went wrong.
        reason: String,
    },

    /// Shutdown requested.
    #[error("Cancelled")]
    Cancelled,

    /// Delta target outside (0, 1).
    #[error("Invalid target delta: {0}")]
    InvalidTargetDelta(DomainError),

    /// Domain rule violated.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Order placement failed.
    #[error(transparent)]
    Execution(ExecutionError),

    /// Market data failure that is neither connection loss nor missing data.
    #[error(transparent)]
    MarketData(MarketDataError),

    /// Archive store failure.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RollEngineError {
    /// Whether the run must stop.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ConnectionFailure { .. } | Self::Cancelled)
    }

    /// Whether this is a partial roll failure.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        matches!(self, Self::PartialRollFailure { .. })
    }
}

impl From<MarketDataError> for RollEngineError {
    fn from(err: MarketDataError) -> Self {
        match err {
            MarketDataError::ConnectionFailure { message } => Self::ConnectionFailure { message },
            MarketDataError::DataUnavailable { subject, message } => {
                Self::DataUnavailable { subject, message }
            }
            MarketDataError::Cancelled => Self::Cancelled,
            other => Self::MarketData(other),
        }
    }
}

impl From<ExecutionError> for RollEngineError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::ConnectionFailure { message } => Self::ConnectionFailure { message },
            other => Self::Execution(other),
        }
    }
}

impl From<SessionError> for RollEngineError {
    fn from(err: SessionError) -> Self {
        Self::ConnectionFailure {
            message: err.to_string(),
        }
    }
}

impl From<StrikeSelectionError> for RollEngineError {
    fn from(err: StrikeSelectionError) -> Self {
        match err {
            StrikeSelectionError::InvalidTargetDelta(e) => Self::InvalidTargetDelta(e),
            StrikeSelectionError::MarketData(e) => e.into(),
        }
    }
}
