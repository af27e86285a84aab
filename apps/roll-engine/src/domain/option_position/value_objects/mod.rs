//! Option Position Value Objects

mod option_contract;
mod option_quote;
mod position;

pub use option_contract::{DEFAULT_EXCHANGE, OptionContract, OptionRight};
pub use option_quote::OptionQuote;
pub use position::OptionPosition;
