//! EOD table merge rules.

use std::collections::HashSet;

use chrono::{Days, Months, NaiveDate};

use super::eod_row::EodRow;

/// The archive contents, ordered by `(contract, date)` after every merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EodTable {
    rows: Vec<EodRow>,
}

impl EodTable {
    /// Wrap rows exactly as loaded.
    #[must_use]
    pub const fn from_rows(rows: Vec<EodRow>) -> Self {
        Self { rows }
    }

    /// Rows in table order.
    #[must_use]
    pub fn rows(&self) -> &[EodRow] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Latest bar date across all contracts.
    #[must_use]
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.date).max()
    }

    /// First date to fetch: the day after the latest stored bar, or
    /// `lookback_years` before `today` for an empty table.
    #[must_use]
    pub fn backfill_start(&self, today: NaiveDate, lookback_years: u32) -> NaiveDate {
        match self.latest_date() {
            Some(latest) => latest.checked_add_days(Days::new(1)).unwrap_or(latest),
            None => today
                .checked_sub_months(Months::new(lookback_years.saturating_mul(12)))
                .unwrap_or(NaiveDate::MIN),
        }
    }

    /// Append `new_rows`, drop duplicate `(contract, date)` keys keeping the
    /// first occurrence, then stable-sort by `(contract, date)`.
    ///
    /// Returns the number of rows that survived deduplication.
    pub fn merge(&mut self, new_rows: Vec<EodRow>) -> usize {
        let before = self.rows.len();
        let mut combined = std::mem::take(&mut self.rows);
        combined.extend(new_rows);

        let mut seen: HashSet<(String, NaiveDate)> = HashSet::with_capacity(combined.len());
        combined.retain(|row| seen.insert((row.contract.clone(), row.date)));
        combined.sort_by(|a, b| a.key().cmp(&b.key()));

        self.rows = combined;
        self.rows.len().saturating_sub(before)
    }
}
