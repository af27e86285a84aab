//! Brokerage gateway adapters.

pub mod ibkr;

pub use ibkr::{IbkrConfig, IbkrError, IbkrGatewayAdapter};
