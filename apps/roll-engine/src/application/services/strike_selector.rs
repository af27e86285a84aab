//! Strike Selector
//!
//! Walks an expiry's strikes in ascending order and returns the first one
//! whose absolute delta reaches the target. Probes are strictly sequential;
//! each one opens and releases its own quote subscription.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use super::quote_probe::QuoteProbe;
use crate::application::ports::{MarketDataError, MarketDataPort};
use crate::domain::option_position::{OptionContract, OptionQuote, OptionRight};
use crate::domain::rolling::validate_target_delta;
use crate::domain::shared::{DomainError, Symbol};

/// Outcome of a strike search. Not finding a strike is a value, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum StrikeSearch {
    /// A strike reached the target.
    Found {
        /// Resolved contract.
        contract: OptionContract,
        /// Quote that satisfied the target.
        quote: OptionQuote,
        /// Strikes probed, including the match.
        probes: usize,
    },
    /// No listed strike reached the target.
    NotFound {
        /// Strikes probed.
        probes: usize,
    },
}

impl StrikeSearch {
    /// Number of strikes probed.
    #[must_use]
    pub const fn probes(&self) -> usize {
        match self {
            Self::Found { probes, .. } | Self::NotFound { probes } => *probes,
        }
    }

    /// The matched strike, if any.
    #[must_use]
    pub fn strike(&self) -> Option<Decimal> {
        match self {
            Self::Found { contract, .. } => Some(contract.strike()),
            Self::NotFound { .. } => None,
        }
    }
}

/// Strike selection errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StrikeSelectionError {
    /// Target delta outside (0, 1).
    #[error("Invalid target delta: {0}")]
    InvalidTargetDelta(DomainError),

    /// Fatal market data failure (connection lost or cancelled).
    #[error(transparent)]
    MarketData(#[from] MarketDataError),
}

/// Delta-targeted strike search for one underlying.
pub struct StrikeSelector<M: MarketDataPort + ?Sized> {
    underlying: Symbol,
    probe: QuoteProbe<M>,
}

impl<M: MarketDataPort + ?Sized> StrikeSelector<M> {
    /// Create a selector for `underlying`.
    pub const fn new(underlying: Symbol, probe: QuoteProbe<M>) -> Self {
        Self { underlying, probe }
    }

    /// Find the lowest strike whose |delta| is at least `target_delta`.
    ///
    /// Strikes whose probe yields no delta or `DataUnavailable` are skipped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTargetDelta` for a target outside (0, 1), or the
    /// market data error when a probe fails fatally.
    pub async fn find_target_strike(
        &self,
        expiry: NaiveDate,
        target_delta: f64,
        right: OptionRight,
    ) -> Result<StrikeSearch, StrikeSelectionError> {
        validate_target_delta(target_delta).map_err(StrikeSelectionError::InvalidTargetDelta)?;

        let strikes = match self
            .probe
            .market_data()
            .chain_strikes(&self.underlying, expiry)
            .await
        {
            Ok(strikes) => strikes,
            Err(MarketDataError::DataUnavailable { subject, message }) => {
                tracing::debug!(%subject, %message, "No option chain for expiry");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let strikes = sorted_strikes(strikes);
        tracing::debug!(
            underlying = %self.underlying,
            expiry = %expiry.format("%Y%m%d"),
            %right,
            target_delta,
            strikes = strikes.len(),
            "Searching strikes"
        );

        let mut probes = 0;
        for strike in strikes {
            let candidate = OptionContract::new(self.underlying.clone(), expiry, strike, right);
            probes += 1;

            let probed = match self.probe.probe(&candidate).await {
                Ok(probed) => probed,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    tracing::debug!(contract = %candidate, error = %e, "Skipping strike");
                    continue;
                }
            };

            if probed.quote.meets_delta(target_delta) {
                tracing::info!(
                    contract = %probed.contract,
                    delta = ?probed.quote.delta,
                    probes,
                    "Found target strike"
                );
                return Ok(StrikeSearch::Found {
                    contract: probed.contract,
                    quote: probed.quote,
                    probes,
                });
            }
            match probed.quote.abs_delta() {
                Some(delta) => {
                    tracing::debug!(contract = %candidate, delta, "Below target delta");
                }
                None => {
                    tracing::debug!(contract = %candidate, "Delta not available");
                }
            }
        }

        tracing::info!(
            underlying = %self.underlying,
            expiry = %expiry.format("%Y%m%d"),
            target_delta,
            probes,
            "No strike reached target delta"
        );
        Ok(StrikeSearch::NotFound { probes })
    }
}

fn sorted_strikes(mut strikes: Vec<Decimal>) -> Vec<Decimal> {
    for strike in &mut strikes {
        *strike = strike.normalize();
    }
    strikes.sort_unstable();
    strikes.dedup();
    strikes
}
