//! Option Contract Value Object

use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::domain::shared::Symbol;

/// Default routing exchange for option orders and quotes.
pub const DEFAULT_EXCHANGE: &str = "SMART";

/// Option right (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptionRight {
    /// Call option (right to buy).
    #[serde(alias = "C", alias = "call")]
    Call,
    /// Put option (right to sell).
    #[serde(alias = "P", alias = "put")]
    Put,
}

impl OptionRight {
    /// Single-letter code used by brokers and the archive ("C" / "P").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Call => "C",
            Self::Put => "P",
        }
    }

    /// Parse a right from a broker code or name.
    #[must_use]
    pub fn from_code(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }
}

impl std::fmt::Display for OptionRight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// A listed option contract.
///
/// Identity is `(underlying, expiry, strike, right)`. Routing and broker
/// metadata (exchange, trading class, contract id) do not take part in
/// equality, so a contract built from config compares equal to the one the
/// gateway resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionContract {
    underlying: Symbol,
    expiry: NaiveDate,
    strike: Decimal,
    right: OptionRight,
    exchange: String,
    trading_class: Option<String>,
    local_symbol: Option<String>,
    conid: Option<i64>,
    multiplier: u32,
}

impl OptionContract {
    /// Create a new option contract routed through [`DEFAULT_EXCHANGE`].
    #[must_use]
    pub fn new(underlying: Symbol, expiry: NaiveDate, strike: Decimal, right: OptionRight) -> Self {
        Self {
            underlying,
            expiry,
            strike: strike.normalize(),
            right,
            exchange: DEFAULT_EXCHANGE.to_string(),
            trading_class: None,
            local_symbol: None,
            conid: None,
            multiplier: 100,
        }
    }

    /// Create a put option contract.
    #[must_use]
    pub fn put(underlying: Symbol, expiry: NaiveDate, strike: Decimal) -> Self {
        Self::new(underlying, expiry, strike, OptionRight::Put)
    }

    /// Set the routing exchange.
    #[must_use]
    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self
    }

    /// Set the trading class.
    #[must_use]
    pub fn with_trading_class(mut self, trading_class: impl Into<String>) -> Self {
        self.trading_class = Some(trading_class.into());
        self
    }

    /// Set the broker's local symbol.
    #[must_use]
    pub fn with_local_symbol(mut self, local_symbol: impl Into<String>) -> Self {
        self.local_symbol = Some(local_symbol.into());
        self
    }

    /// Set the broker contract id.
    #[must_use]
    pub const fn with_conid(mut self, conid: i64) -> Self {
        self.conid = Some(conid);
        self
    }

    /// Set a custom multiplier.
    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Get the underlying symbol.
    #[must_use]
    pub const fn underlying(&self) -> &Symbol {
        &self.underlying
    }

    /// Get the expiration date.
    #[must_use]
    pub const fn expiry(&self) -> NaiveDate {
        self.expiry
    }

    /// Get the strike price.
    #[must_use]
    pub const fn strike(&self) -> Decimal {
        self.strike
    }

    /// Get the option right.
    #[must_use]
    pub const fn right(&self) -> OptionRight {
        self.right
    }

    /// Get the routing exchange.
    #[must_use]
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Get the trading class, if known.
    #[must_use]
    pub fn trading_class(&self) -> Option<&str> {
        self.trading_class.as_deref()
    }

    /// Get the broker contract id, if resolved.
    #[must_use]
    pub const fn conid(&self) -> Option<i64> {
        self.conid
    }

    /// Get the contract multiplier.
    #[must_use]
    pub const fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Check if this is a put option.
    #[must_use]
    pub const fn is_put(&self) -> bool {
        matches!(self.right, OptionRight::Put)
    }

    /// Expiry in the broker's `YYYYMMDD` form.
    #[must_use]
    pub fn expiry_code(&self) -> String {
        self.expiry.format("%Y%m%d").to_string()
    }

    /// OCC-style symbol: root padded to 6, `YYMMDD`, right, strike × 1000 in 8 digits.
    #[must_use]
    pub fn occ_symbol(&self) -> String {
        let millis = (self.strike * Decimal::ONE_THOUSAND)
            .trunc()
            .to_u64()
            .unwrap_or_default();
        format!(
            "{:<6}{}{}{:08}",
            self.underlying.as_str(),
            self.expiry.format("%y%m%d"),
            self.right.code(),
            millis
        )
    }

    /// Identifier used in logs and the archive: the broker's local symbol when
    /// known, otherwise the OCC symbol.
    #[must_use]
    pub fn display_symbol(&self) -> String {
        self.local_symbol
            .clone()
            .unwrap_or_else(|| self.occ_symbol())
    }

    /// Check if the option has expired.
    #[must_use]
    pub fn is_expired(&self, as_of: NaiveDate) -> bool {
        self.expiry < as_of
    }
}

impl PartialEq for OptionContract {
    fn eq(&self, other: &Self) -> bool {
        self.underlying == other.underlying
            && self.expiry == other.expiry
            && self.strike == other.strike
            && self.right == other.right
    }
}

impl Eq for OptionContract {}

impl Hash for OptionContract {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.underlying.hash(state);
        self.expiry.hash(state);
        self.strike.normalize().hash(state);
        self.right.hash(state);
    }
}

impl std::fmt::Display for OptionContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}{}",
            self.underlying,
            self.expiry_code(),
            self.strike,
            self.right.code()
        )
    }
}
