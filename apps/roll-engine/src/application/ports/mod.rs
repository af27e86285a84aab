//! Application Ports (Driven)
//!
//! Ports define interfaces for the external systems the engine consumes:
//! the brokerage session, its market data and execution capabilities, and the
//! EOD archive store.

mod archive_store_port;
mod execution_port;
mod market_data_port;
mod session_port;

pub use archive_store_port::{ArchiveError, ArchiveStorePort, InMemoryArchiveStore};
pub use execution_port::{
    ExecutionError, ExecutionPort, OrderConfirmation, OrderRequest, OrderState,
};
pub use market_data_port::{MarketDataError, MarketDataPort, QuoteTicket};
pub use session_port::{GatewaySessionPort, SessionError, SessionInfo};
