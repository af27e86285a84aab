//! Application Services
//!
//! Reusable building blocks shared by the use cases: scoped quote probing and
//! the delta-targeted strike search built on it.

mod quote_probe;
mod strike_selector;

pub use quote_probe::{DEFAULT_SETTLE_DELAY, ProbedQuote, QuoteProbe, QuoteSubscription};
pub use strike_selector::{StrikeSearch, StrikeSelectionError, StrikeSelector};
