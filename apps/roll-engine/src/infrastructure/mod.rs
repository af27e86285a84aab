//! Infrastructure Layer
//!
//! Adapters behind the application ports: the brokerage gateway and the
//! archive file.

pub mod archive;
pub mod gateway;

pub use archive::CsvArchiveStore;
pub use gateway::{IbkrConfig, IbkrError, IbkrGatewayAdapter};
