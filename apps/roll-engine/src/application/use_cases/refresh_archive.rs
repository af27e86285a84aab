//! Refresh Archive Use Case
//!
//! Incrementally fetches daily bars for every listed contract and merges them
//! into the EOD archive. Runs independently of the roll decision.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::application::ports::{ArchiveStorePort, MarketDataError, MarketDataPort};
use crate::domain::archive::{BarSize, EodRow};
use crate::domain::option_position::{OptionContract, OptionRight};
use crate::domain::shared::Symbol;
use crate::error::RollEngineError;

/// Default history fetched into an empty archive.
pub const DEFAULT_LOOKBACK_YEARS: u32 = 2;

/// Settings for the archive refresh.
#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    /// Underlying whose options are archived.
    pub underlying: Symbol,
    /// Rights to archive.
    pub rights: Vec<OptionRight>,
    /// History fetched into an empty archive.
    pub lookback_years: u32,
}

impl ArchiveSettings {
    /// Puts only, with the default lookback.
    pub fn new(underlying: Symbol) -> Self {
        Self {
            underlying,
            rights: vec![OptionRight::Put],
            lookback_years: DEFAULT_LOOKBACK_YEARS,
        }
    }
}

/// Outcome of one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Where the archive lives.
    pub location: String,
    /// First date requested.
    pub start: NaiveDate,
    /// Last date requested.
    pub end: NaiveDate,
    /// Contracts queried.
    pub contracts: usize,
    /// Contracts skipped for missing or failed data.
    pub skipped: usize,
    /// Rows fetched from the gateway.
    pub fetched: usize,
    /// Rows new to the archive after deduplication.
    pub added: usize,
}

impl ArchiveReport {
    /// Human-readable summary.
    #[must_use]
    pub fn message(&self) -> String {
        if self.fetched == 0 {
            "No new EOD data to append.".to_string()
        } else {
            format!("Appended {} rows to {}", self.fetched, self.location)
        }
    }
}

/// Use case for the incremental EOD archive refresh.
pub struct RefreshArchiveUseCase<M, A>
where
    M: MarketDataPort + ?Sized,
    A: ArchiveStorePort + ?Sized,
{
    market_data: Arc<M>,
    store: Arc<A>,
    settings: ArchiveSettings,
}

impl<M, A> RefreshArchiveUseCase<M, A>
where
    M: MarketDataPort + ?Sized,
    A: ArchiveStorePort + ?Sized,
{
    /// Create a new `RefreshArchiveUseCase`.
    pub const fn new(market_data: Arc<M>, store: Arc<A>, settings: ArchiveSettings) -> Self {
        Self {
            market_data,
            store,
            settings,
        }
    }

    /// Fetch everything after the archive's latest date up to `today`.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be loaded or saved, or the
    /// gateway connection fails. Per-contract data errors are logged and
    /// skipped.
    pub async fn execute(&self, today: NaiveDate) -> Result<ArchiveReport, RollEngineError> {
        let mut table = self.store.load().await?;
        let start = table.backfill_start(today, self.settings.lookback_years);
        let mut report = ArchiveReport {
            location: self.store.location(),
            start,
            end: today,
            contracts: 0,
            skipped: 0,
            fetched: 0,
            added: 0,
        };

        if start > today {
            tracing::info!(%start, %today, "Archive already up to date");
            tracing::info!("{}", report.message());
            return Ok(report);
        }

        let mut rows = Vec::new();
        for right in &self.settings.rights {
            let contracts = self
                .market_data
                .list_contracts(&self.settings.underlying, *right)
                .await
                .map_err(RollEngineError::from)?;
            tracing::debug!(%right, contracts = contracts.len(), "Listed contracts");

            for contract in contracts {
                report.contracts += 1;
                match self.fetch_rows(&contract, start, today).await {
                    Ok(fetched) if fetched.is_empty() => report.skipped += 1,
                    Ok(fetched) => rows.extend(fetched),
                    Err(e) if e.is_fatal() => return Err(e.into()),
                    Err(e) => {
                        tracing::warn!(contract = %contract, error = %e, "Skipping contract");
                        report.skipped += 1;
                    }
                }
            }
        }

        report.fetched = rows.len();
        if rows.is_empty() {
            tracing::info!("{}", report.message());
            return Ok(report);
        }

        report.added = table.merge(rows);
        self.store.save(&table).await?;

        tracing::info!(
            location = %report.location,
            fetched = report.fetched,
            added = report.added,
            skipped = report.skipped,
            "{}",
            report.message()
        );
        Ok(report)
    }

    async fn fetch_rows(
        &self,
        contract: &OptionContract,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<EodRow>, MarketDataError> {
        let bars = match self
            .market_data
            .historical_bars(contract, start, end, BarSize::OneDay)
            .await
        {
            Ok(bars) => bars,
            Err(MarketDataError::DataUnavailable { message, .. }) => {
                tracing::debug!(contract = %contract, %message, "No bars");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        Ok(bars
            .iter()
            .filter(|bar| bar.date >= start)
            .map(|bar| EodRow::from_bar(contract, bar))
            .collect())
    }
}
