//! Application Layer
//!
//! The application layer orchestrates domain logic through use cases.
//! It defines:
//!
//! - **Ports**: Interfaces for the gateway session, market data, execution
//!   and the archive store
//! - **Services**: Scoped quote probing and strike selection
//! - **Use Cases**: Archive refresh, the monthly and weekly rolls, and the run
//!   cycle that sequences them

pub mod ports;
pub mod services;
pub mod use_cases;

pub use ports::*;
pub use services::*;
pub use use_cases::*;
