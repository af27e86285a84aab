//! Earnings calendar.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Ordered, de-duplicated list of earnings dates.
///
/// Injected from configuration; the engine only reads it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<NaiveDate>", into = "Vec<NaiveDate>")]
pub struct EarningsCalendar {
    dates: Vec<NaiveDate>,
}

impl EarningsCalendar {
    /// Build a calendar from dates in any order.
    #[must_use]
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let mut dates: Vec<NaiveDate> = dates.into_iter().collect();
        dates.sort_unstable();
        dates.dedup();
        Self { dates }
    }

    /// All dates, ascending.
    #[must_use]
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Whether the calendar has no dates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// The latest date that is on or before `today`.
    #[must_use]
    pub fn most_recent_on_or_before(&self, today: NaiveDate) -> Option<NaiveDate> {
        let idx = self.dates.partition_point(|d| *d <= today);
        idx.checked_sub(1).map(|i| self.dates[i])
    }
}

impl From<Vec<NaiveDate>> for EarningsCalendar {
    fn from(dates: Vec<NaiveDate>) -> Self {
        Self::new(dates)
    }
}

impl From<EarningsCalendar> for Vec<NaiveDate> {
    fn from(calendar: EarningsCalendar) -> Self {
        calendar.dates
    }
}
