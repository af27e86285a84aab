//! Money value object for option prices.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::DomainError;

/// A per-share option price in USD.
///
/// Represented as a Decimal for precise financial calculations.
/// Always uses 2 decimal places for display (but internal precision is higher).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new Money value from a Decimal.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Midpoint of two prices, rounded to cents.
    #[must_use]
    pub fn midpoint(a: Self, b: Self) -> Self {
        Self(((a.0 + b.0) / Decimal::TWO).round_dp(2))
    }

    /// Get the inner Decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if this amount is positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Round to 2 decimal places.
    #[must_use]
    pub fn round(&self) -> Self {
        Self(self.0.round_dp(2))
    }

    /// Check that the amount can be used as a limit price.
    ///
    /// # Errors
    ///
    /// Returns error if amount is zero or negative.
    pub fn validate_limit_price(&self) -> Result<(), DomainError> {
        if !self.is_positive() {
            return Err(DomainError::invalid_value(
                "limit_price",
                format!("Limit price must be positive, got {self}"),
            ));
        }
        Ok(())
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_midpoint_rounds_to_cents() {
        let mid = Money::midpoint(Money::new(dec!(1.20)), Money::new(dec!(1.35)));
        assert_eq!(mid.amount(), dec!(1.28));
    }

    #[test]
    fn money_midpoint_exact() {
        let mid = Money::midpoint(Money::new(dec!(2.10)), Money::new(dec!(2.30)));
        assert_eq!(mid.amount(), dec!(2.20));
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::new(dec!(1.5)).to_string(), "$1.50");
        assert_eq!(Money::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn money_validate_limit_price() {
        assert!(Money::new(dec!(0.05)).validate_limit_price().is_ok());
        assert!(Money::ZERO.validate_limit_price().is_err());
        assert!(Money::new(dec!(-1)).validate_limit_price().is_err());
    }
}
