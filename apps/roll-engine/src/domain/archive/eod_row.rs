//! End-of-day archive row.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bar::HistoricalBar;
use crate::domain::option_position::{OptionContract, OptionRight};

/// Column order of the archive file.
pub const EOD_COLUMNS: [&str; 9] = [
    "contract", "expiry", "strike", "right", "date", "bid", "ask", "last", "volume",
];

/// One row of the EOD archive, keyed by `(contract, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EodRow {
    /// Contract identifier (broker local symbol or OCC symbol).
    pub contract: String,
    /// Expiry as `YYYYMMDD`.
    pub expiry: String,
    /// Strike price.
    #[serde(with = "rust_decimal::serde::str")]
    pub strike: Decimal,
    /// Option right, stored as "P" / "C".
    #[serde(with = "right_code")]
    pub right: OptionRight,
    /// Bar date.
    pub date: NaiveDate,
    /// Bid column.
    #[serde(with = "rust_decimal::serde::str")]
    pub bid: Decimal,
    /// Ask column.
    #[serde(with = "rust_decimal::serde::str")]
    pub ask: Decimal,
    /// Last column.
    #[serde(with = "rust_decimal::serde::str")]
    pub last: Decimal,
    /// Volume column.
    #[serde(with = "rust_decimal::serde::str")]
    pub volume: Decimal,
}

impl EodRow {
    /// Build a row from a bid/ask bar.
    ///
    /// Column mapping: `bid = high`, `ask = low`, `last = close`.
    #[must_use]
    pub fn from_bar(contract: &OptionContract, bar: &HistoricalBar) -> Self {
        Self {
            contract: contract.display_symbol(),
            expiry: contract.expiry_code(),
            strike: contract.strike().normalize(),
            right: contract.right(),
            date: bar.date,
            bid: bar.high.normalize(),
            ask: bar.low.normalize(),
            last: bar.close.normalize(),
            volume: bar.volume.normalize(),
        }
    }

    /// Deduplication key.
    #[must_use]
    pub fn key(&self) -> (&str, NaiveDate) {
        (self.contract.as_str(), self.date)
    }
}

mod right_code {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::domain::option_position::OptionRight;

    pub fn serialize<S: Serializer>(right: &OptionRight, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(right.code())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<OptionRight, D::Error> {
        let raw = String::deserialize(deserializer)?;
        OptionRight::from_code(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown option right '{raw}'")))
    }
}
