//! Option Position Bounded Context
//!
//! Option contracts, live quotes and held positions as seen by the roll engine.
//! The brokerage account owns positions; this context only describes them.

pub mod value_objects;

pub use value_objects::{DEFAULT_EXCHANGE, OptionContract, OptionPosition, OptionQuote, OptionRight};
