//! EOD Archive Bounded Context
//!
//! The end-of-day option price table: rows keyed by `(contract, date)`,
//! appended, de-duplicated and re-sorted on every write.

mod bar;
mod eod_row;
mod table;

pub use bar::{BarSize, HistoricalBar};
pub use eod_row::{EOD_COLUMNS, EodRow};
pub use table::EodTable;
