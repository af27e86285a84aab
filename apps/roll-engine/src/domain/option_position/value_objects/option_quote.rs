//! Option Quote Value Object

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::Money;

/// A point-in-time quote for one option contract.
///
/// Quotes are read once per decision and never cached. `delta` is the
/// gateway's modeled greek and stays signed (puts are negative).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    /// Best bid.
    pub bid: Money,
    /// Best ask.
    pub ask: Money,
    /// Last traded price, if reported.
    pub last: Option<Money>,
    /// Modeled delta, if the greeks have arrived.
    pub delta: Option<f64>,
}

impl OptionQuote {
    /// Create a quote from bid, ask and an optional delta.
    #[must_use]
    pub const fn new(bid: Decimal, ask: Decimal, delta: Option<f64>) -> Self {
        Self {
            bid: Money::new(bid),
            ask: Money::new(ask),
            last: None,
            delta,
        }
    }

    /// Attach a last price.
    #[must_use]
    pub const fn with_last(mut self, last: Decimal) -> Self {
        self.last = Some(Money::new(last));
        self
    }

    /// Bid/ask midpoint, rounded to cents.
    #[must_use]
    pub fn mid(&self) -> Money {
        Money::midpoint(self.bid, self.ask)
    }

    /// Absolute delta, if available.
    #[must_use]
    pub fn abs_delta(&self) -> Option<f64> {
        self.delta.map(f64::abs)
    }

    /// Whether this quote's delta magnitude reaches `target`.
    ///
    /// A quote without delta never meets a target.
    #[must_use]
    pub fn meets_delta(&self, target: f64) -> bool {
        self.abs_delta().is_some_and(|d| d >= target)
    }

    /// Whether both sides of the market are present.
    #[must_use]
    pub fn has_market(&self) -> bool {
        self.bid.is_positive() && self.ask.is_positive()
    }

    /// Whether there is an offer to buy against. The bid may be zero, as on
    /// a far out-of-the-money option near expiry.
    #[must_use]
    pub fn has_offer(&self) -> bool {
        self.ask.is_positive() && !self.bid.amount().is_sign_negative()
    }

    /// Limit price for a buy: the midpoint, or the ask when the midpoint
    /// rounds to zero.
    #[must_use]
    pub fn buy_limit(&self) -> Money {
        let mid = self.mid();
        if mid.is_positive() { mid } else { self.ask }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test]
    fn quote_mid() {
        let quote = OptionQuote::new(dec!(1.10), dec!(1.30), Some(-0.12));
        assert_eq!(quote.mid().amount(), dec!(1.20));
    }

    #[test_case(Some(-0.12), 0.10, true ; "put delta above target")]
    #[test_case(Some(-0.10), 0.10, true ; "exactly at target")]
    #[test_case(Some(-0.05), 0.10, false ; "below target")]
    #[test_case(Some(0.15), 0.10, true ; "call delta above target")]
    #[test_case(None, 0.10, false ; "no greeks yet")]
    fn quote_meets_delta(delta: Option<f64>, target: f64, expected: bool) {
        let quote = OptionQuote::new(dec!(1), dec!(2), delta);
        assert_eq!(quote.meets_delta(target), expected);
    }

    #[test]
    fn quote_has_market() {
        assert!(OptionQuote::new(dec!(0.05), dec!(0.10), None).has_market());
        assert!(!OptionQuote::new(dec!(0), dec!(0.10), None).has_market());
        assert!(!OptionQuote::new(dec!(0), dec!(0), None).has_market());
    }

    #[test_case(dec!(0.05), dec!(0.10), true ; "two sided")]
    #[test_case(dec!(0), dec!(0.05), true ; "zero bid")]
    #[test_case(dec!(0.05), dec!(0), false ; "zero ask")]
    #[test_case(dec!(0), dec!(0), false ; "empty book")]
    fn quote_has_offer(bid: Decimal, ask: Decimal, expected: bool) {
        assert_eq!(OptionQuote::new(bid, ask, None).has_offer(), expected);
    }

    #[test_case(dec!(0), dec!(0.05), dec!(0.02) ; "zero bid uses mid")]
    #[test_case(dec!(0), dec!(0.01), dec!(0.01) ; "sub cent mid falls back to ask")]
    #[test_case(dec!(1.10), dec!(1.30), dec!(1.20) ; "two sided mid")]
    fn quote_buy_limit(bid: Decimal, ask: Decimal, expected: Decimal) {
        assert_eq!(OptionQuote::new(bid, ask, None).buy_limit().amount(), expected);
    }

    #[test]
    fn quote_with_last() {
        let quote = OptionQuote::new(dec!(1), dec!(2), None).with_last(dec!(1.5));
        assert_eq!(quote.last, Some(Money::new(dec!(1.5))));
    }
}
