//! Held Option Position

use serde::{Deserialize, Serialize};

use super::option_contract::{OptionContract, OptionRight};
use crate::domain::shared::Symbol;

/// An option position held in the brokerage account.
///
/// The account is the system of record; this is a read-only snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionPosition {
    /// The held contract.
    pub contract: OptionContract,
    /// Signed contract count (negative = short).
    pub quantity: i64,
}

impl OptionPosition {
    /// Create a new position snapshot.
    #[must_use]
    pub const fn new(contract: OptionContract, quantity: i64) -> Self {
        Self { contract, quantity }
    }

    /// Whether the position is short.
    #[must_use]
    pub const fn is_short(&self) -> bool {
        self.quantity < 0
    }

    /// Whether this is a short put on `underlying`.
    #[must_use]
    pub fn is_short_put_on(&self, underlying: &Symbol) -> bool {
        self.is_short()
            && self.contract.right() == OptionRight::Put
            && self.contract.underlying() == underlying
    }

    /// Contracts to buy back to flatten the position.
    #[must_use]
    pub const fn close_quantity(&self) -> u64 {
        self.quantity.unsigned_abs()
    }
}
