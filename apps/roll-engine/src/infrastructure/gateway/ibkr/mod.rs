//! Interactive Brokers Client Portal Gateway Adapter
//!
//! Implements the session, market data and execution ports over the local
//! Client Portal gateway's REST API with:
//! - Retry logic with jittered exponential backoff
//! - Quote streams closed by a background worker as tickets are released
//! - Order confirmation prompts answered automatically (bounded)

mod adapter;
mod api_types;
mod config;
mod error;
mod http_client;

pub use adapter::IbkrGatewayAdapter;
pub use config::{IbkrConfig, RetryConfig};
pub use error::IbkrError;
