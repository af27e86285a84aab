//! Shared Value Objects
//!
//! Immutable domain types used across bounded contexts.
//! Value objects are compared by value, not identity.

mod identifiers;
mod money;
mod order_side;
mod symbol;

pub use identifiers::{BrokerOrderId, ClientOrderId};
pub use money::Money;
pub use order_side::OrderSide;
pub use symbol::Symbol;
