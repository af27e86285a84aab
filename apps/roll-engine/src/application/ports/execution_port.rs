//! Execution Port (Driven Port)
//!
//! Interface for positions, limit orders and assignment history.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::option_position::{OptionContract, OptionPosition};
use crate::domain::shared::{BrokerOrderId, ClientOrderId, Money, OrderSide, Symbol};

/// Request to place a DAY limit order for an option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Client order ID.
    pub client_order_id: ClientOrderId,
    /// Contract to trade.
    pub contract: OptionContract,
    /// Order side.
    pub side: OrderSide,
    /// Contracts.
    pub quantity: u64,
    /// Limit price per share.
    pub limit_price: Money,
}

impl OrderRequest {
    /// Create a limit order request.
    #[must_use]
    pub const fn limit(
        client_order_id: ClientOrderId,
        contract: OptionContract,
        side: OrderSide,
        quantity: u64,
        limit_price: Money,
    ) -> Self {
        Self {
            client_order_id,
            contract,
            side,
            quantity,
            limit_price,
        }
    }
}

/// Order state reported by the gateway on acceptance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    /// Accepted locally, not yet at the exchange.
    PendingSubmit,
    /// Accepted and held until the market opens.
    PreSubmitted,
    /// Working at the exchange.
    Submitted,
    /// Filled.
    Filled,
    /// Cancelled.
    Cancelled,
    /// Rejected or inactive.
    Inactive,
    /// Status text not recognized.
    Unknown,
}

impl OrderState {
    /// Map a gateway status string.
    #[must_use]
    pub fn from_gateway(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "pendingsubmit" | "pending_submit" => Self::PendingSubmit,
            "presubmitted" | "pre_submitted" => Self::PreSubmitted,
            "submitted" => Self::Submitted,
            "filled" => Self::Filled,
            "cancelled" | "pendingcancel" | "apicancelled" => Self::Cancelled,
            "inactive" | "rejected" => Self::Inactive,
            _ => Self::Unknown,
        }
    }

    /// Whether the order is live or done (i.e. confirmed).
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(
            self,
            Self::PendingSubmit | Self::PreSubmitted | Self::Submitted | Self::Filled
        )
    }
}

/// Confirmation returned once the gateway accepted an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    /// Gateway order ID.
    pub order_id: BrokerOrderId,
    /// Client order ID echoed back.
    pub client_order_id: ClientOrderId,
    /// State on acceptance.
    pub state: OrderState,
}

/// Execution port error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Gateway unreachable or session lost.
    #[error("Execution connection failure: {message}")]
    ConnectionFailure {
        /// Error details.
        message: String,
    },

    /// Order rejected by the gateway.
    #[error("Order rejected: {reason}")]
    OrderRejected {
        /// Rejection reason.
        reason: String,
    },

    /// The gateway answered without confirming the order.
    #[error("Order {client_order_id} not confirmed (state {state:?})")]
    Unconfirmed {
        /// Client order ID.
        client_order_id: String,
        /// State reported.
        state: OrderState,
    },

    /// Rate limited.
    #[error("Rate limited by gateway")]
    RateLimited,

    /// Unexpected gateway response.
    #[error("Execution error: {message}")]
    Api {
        /// Error details.
        message: String,
    },
}

impl ExecutionError {
    /// Whether the error should abort the whole run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ConnectionFailure { .. })
    }
}

/// Port for order execution and account state.
#[async_trait]
pub trait ExecutionPort: Send + Sync {
    /// Option positions held on `underlying`.
    async fn positions(&self, underlying: &Symbol) -> Result<Vec<OptionPosition>, ExecutionError>;

    /// Place a limit order and wait for the gateway's confirmation.
    async fn place_order(&self, request: OrderRequest) -> Result<OrderConfirmation, ExecutionError>;

    /// Whether a short option on `underlying` was assigned on `date`.
    async fn assignment_history(
        &self,
        underlying: &Symbol,
        date: NaiveDate,
    ) -> Result<bool, ExecutionError>;
}
