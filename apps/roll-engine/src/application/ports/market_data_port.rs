//! Market Data Port (Driven Port)
//!
//! Interface for option chains, quotes and historical bars.
//!
//! Quotes follow an explicit subscription lifecycle: `subscribe_quote` opens a
//! stream and hands back a [`QuoteTicket`], `read_quote` reads the latest
//! values, and `release_quote` closes the stream. `release_quote` is
//! synchronous and infallible so it can run from `Drop`.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::archive::{BarSize, HistoricalBar};
use crate::domain::option_position::{OptionContract, OptionQuote, OptionRight};
use crate::domain::shared::Symbol;

/// Handle for an open quote subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuoteTicket {
    id: u64,
    contract: OptionContract,
}

impl QuoteTicket {
    /// Create a ticket for `contract`.
    #[must_use]
    pub const fn new(id: u64, contract: OptionContract) -> Self {
        Self { id, contract }
    }

    /// Subscription id (unique per session).
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The contract as resolved by the gateway.
    #[must_use]
    pub const fn contract(&self) -> &OptionContract {
        &self.contract
    }
}

/// Market data port error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarketDataError {
    /// Gateway unreachable or session lost.
    #[error("Market data connection failure: {message}")]
    ConnectionFailure {
        /// Error details.
        message: String,
    },

    /// The gateway has no data for the request.
    #[error("Data unavailable for {subject}: {message}")]
    DataUnavailable {
        /// What was requested (contract, symbol, expiry).
        subject: String,
        /// Error details.
        message: String,
    },

    /// Rate limited.
    #[error("Market data rate limited")]
    RateLimited,

    /// The wait was interrupted by shutdown.
    #[error("Market data request cancelled")]
    Cancelled,

    /// Unexpected gateway response.
    #[error("Market data error: {message}")]
    Api {
        /// Error details.
        message: String,
    },
}

impl MarketDataError {
    /// Shorthand for [`MarketDataError::DataUnavailable`].
    pub fn unavailable(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataUnavailable {
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Whether the error should abort the whole run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ConnectionFailure { .. } | Self::Cancelled)
    }
}

/// Port for option market data.
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// All listed option contracts of `underlying` for `right`.
    async fn list_contracts(
        &self,
        underlying: &Symbol,
        right: OptionRight,
    ) -> Result<Vec<OptionContract>, MarketDataError>;

    /// Strikes listed for `underlying` around `expiry` (unsorted).
    async fn chain_strikes(
        &self,
        underlying: &Symbol,
        expiry: NaiveDate,
    ) -> Result<Vec<Decimal>, MarketDataError>;

    /// Open a quote subscription.
    async fn subscribe_quote(
        &self,
        contract: &OptionContract,
    ) -> Result<QuoteTicket, MarketDataError>;

    /// Read the latest quote of an open subscription.
    async fn read_quote(&self, ticket: &QuoteTicket) -> Result<OptionQuote, MarketDataError>;

    /// Close a subscription. Must be called exactly once per ticket.
    fn release_quote(&self, ticket: QuoteTicket);

    /// Historical bars between `start` and `end` inclusive.
    async fn historical_bars(
        &self,
        contract: &OptionContract,
        start: NaiveDate,
        end: NaiveDate,
        bar_size: BarSize,
    ) -> Result<Vec<HistoricalBar>, MarketDataError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn ticket_accessors() {
        let contract = OptionContract::put(
            Symbol::new("MSTR"),
            NaiveDate::from_ymd_opt(2025, 2, 15).unwrap(),
            dec!(90),
        );
        let ticket = QuoteTicket::new(7, contract.clone());
        assert_eq!(ticket.id(), 7);
        assert_eq!(ticket.contract(), &contract);
    }

    #[test]
    fn fatal_errors() {
        assert!(MarketDataError::ConnectionFailure {
            message: "down".to_string()
        }
        .is_fatal());
        assert!(MarketDataError::Cancelled.is_fatal());
        assert!(!MarketDataError::unavailable("MSTR", "no bars").is_fatal());
        assert!(!MarketDataError::RateLimited.is_fatal());
    }

    #[test]
    fn error_display() {
        let err = MarketDataError::unavailable("MSTR 20250215 90P", "not listed");
        assert_eq!(
            err.to_string(),
            "Data unavailable for MSTR 20250215 90P: not listed"
        );
    }
}
