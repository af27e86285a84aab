//! Client Portal API request and response types.
//!
//! These types map directly to the gateway's REST format. The gateway is
//! loose with number encoding (contract ids and strikes arrive as either
//! strings or numbers), so those fields go through [`Flex`].

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::archive::HistoricalBar;
use crate::domain::option_position::{OptionContract, OptionQuote, OptionRight};
use crate::domain::shared::Symbol;

/// Snapshot field: last price.
pub const FIELD_LAST: &str = "31";
/// Snapshot field: bid.
pub const FIELD_BID: &str = "84";
/// Snapshot field: ask.
pub const FIELD_ASK: &str = "86";
/// Snapshot field: modeled delta.
pub const FIELD_DELTA: &str = "7308";

/// Fields requested on every quote snapshot.
pub const SNAPSHOT_FIELDS: &str = "31,84,86,7308";

// ============================================================================
// Number helpers
// ============================================================================

/// A number the gateway may send as text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Flex {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Flex {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) => Some(f.round() as i64),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

fn de_conid<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Flex::deserialize(deserializer)?
        .as_i64()
        .ok_or_else(|| serde::de::Error::custom("conid is not an integer"))
}

fn de_opt_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<Flex>::deserialize(deserializer)?.and_then(|f| f.as_f64()))
}

/// Strike as a normalized decimal.
pub fn strike_decimal(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| d.round_dp(4).normalize())
}

/// Parse a gateway date (`YYYYMMDD`, optionally followed by a time).
pub fn parse_gateway_date(value: &str) -> Option<NaiveDate> {
    let digits = value.get(..8)?;
    NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
}

/// Option month code as the gateway spells it (`FEB25`).
pub fn month_code(date: NaiveDate) -> String {
    date.format("%b%y").to_string().to_uppercase()
}

/// Parse a snapshot price field.
///
/// Values come as text and may carry a one-letter prefix (`C` for a prior
/// close, `H` for halted).
fn parse_snapshot_value(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().and_then(Decimal::from_f64),
        serde_json::Value::String(s) => {
            let cleaned: String = s
                .trim()
                .trim_start_matches(|c: char| c.is_ascii_alphabetic())
                .chars()
                .filter(|c| *c != ',')
                .collect();
            cleaned.parse::<Decimal>().ok()
        }
        _ => None,
    }
}

// ============================================================================
// Session Types
// ============================================================================

/// Response of `/iserver/auth/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthStatusResponse {
    /// Brokerage session authenticated.
    #[serde(default)]
    pub authenticated: bool,
    /// Gateway connected to the backend.
    #[serde(default)]
    pub connected: bool,
    /// Another session is competing for this login.
    #[serde(default)]
    pub competing: bool,
    /// Status message.
    #[serde(default)]
    pub message: String,
}

/// Response of `/iserver/accounts`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountsResponse {
    /// Accounts available to the session.
    #[serde(default)]
    pub accounts: Vec<String>,
    /// Account currently selected by the gateway.
    #[serde(rename = "selectedAccount", default)]
    pub selected_account: Option<String>,
}

impl AccountsResponse {
    /// The configured account when set, otherwise the gateway's selection.
    pub fn resolve(&self, configured: &str) -> Option<String> {
        if !configured.is_empty() {
            return Some(configured.to_string());
        }
        self.selected_account
            .clone()
            .filter(|a| !a.is_empty())
            .or_else(|| self.accounts.first().cloned())
    }
}

// ============================================================================
// Contract Types
// ============================================================================

/// One result of `/iserver/secdef/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SecdefSearchEntry {
    /// Underlying contract id.
    #[serde(deserialize_with = "de_conid")]
    pub conid: i64,
    /// Ticker.
    #[serde(default)]
    pub symbol: String,
    /// Derivative sections listed for the underlying.
    #[serde(default)]
    pub sections: Vec<SearchSection>,
}

impl SecdefSearchEntry {
    /// Option month codes listed for the underlying (`JAN25`, `FEB25`, ...).
    pub fn option_months(&self) -> Vec<String> {
        self.sections
            .iter()
            .filter(|s| s.sec_type == "OPT")
            .filter_map(|s| s.months.as_deref())
            .flat_map(|m| m.split(';'))
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// A derivative section of a search result.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSection {
    /// Security type (`OPT`, `FOP`, `WAR`, ...).
    #[serde(rename = "secType")]
    pub sec_type: String,
    /// Semicolon-separated month codes.
    #[serde(default)]
    pub months: Option<String>,
}

/// Response of `/iserver/secdef/strikes`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StrikesResponse {
    /// Call strikes.
    #[serde(default)]
    pub call: Vec<f64>,
    /// Put strikes.
    #[serde(default)]
    pub put: Vec<f64>,
}

impl StrikesResponse {
    /// Strikes listed for `right`.
    pub fn for_right(&self, right: OptionRight) -> Vec<Decimal> {
        let raw = match right {
            OptionRight::Call => &self.call,
            OptionRight::Put => &self.put,
        };
        raw.iter().copied().filter_map(strike_decimal).collect()
    }

    /// Union of call and put strikes, unsorted.
    pub fn union(&self) -> Vec<Decimal> {
        let mut all = self.for_right(OptionRight::Put);
        for strike in self.for_right(OptionRight::Call) {
            if !all.contains(&strike) {
                all.push(strike);
            }
        }
        all
    }
}

/// One result of `/iserver/secdef/info`.
#[derive(Debug, Clone, Deserialize)]
pub struct SecdefInfo {
    /// Option contract id.
    #[serde(deserialize_with = "de_conid")]
    pub conid: i64,
    /// Right (`P` / `C`).
    #[serde(default)]
    pub right: String,
    /// Strike.
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub strike: Option<f64>,
    /// Expiry as `YYYYMMDD`.
    #[serde(rename = "maturityDate", default)]
    pub maturity_date: String,
    /// Contract multiplier.
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub multiplier: Option<f64>,
    /// Trading class.
    #[serde(rename = "tradingClass", default)]
    pub trading_class: Option<String>,
}

impl SecdefInfo {
    /// Expiry date, if parseable.
    pub fn expiry(&self) -> Option<NaiveDate> {
        parse_gateway_date(&self.maturity_date)
    }

    /// Convert to a resolved domain contract.
    pub fn to_contract(&self, underlying: &Symbol, exchange: &str) -> Option<OptionContract> {
        let right = OptionRight::from_code(&self.right)?;
        let strike = self.strike.and_then(strike_decimal)?;
        let mut contract = OptionContract::new(underlying.clone(), self.expiry()?, strike, right)
            .with_conid(self.conid)
            .with_exchange(exchange);
        if let Some(class) = self.trading_class.as_deref().filter(|c| !c.is_empty()) {
            contract = contract.with_trading_class(class);
        }
        if let Some(multiplier) = self.multiplier.filter(|m| *m >= 1.0) {
            contract = contract.with_multiplier(multiplier as u32);
        }
        Some(contract)
    }
}

// ============================================================================
// Market Data Types
// ============================================================================

/// One entry of `/iserver/marketdata/snapshot`.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotEntry {
    /// Contract id.
    #[serde(deserialize_with = "de_conid")]
    pub conid: i64,
    /// Requested fields keyed by field code.
    #[serde(flatten)]
    pub fields: HashMap<String, serde_json::Value>,
}

impl SnapshotEntry {
    /// Decimal value of a field.
    pub fn decimal(&self, code: &str) -> Option<Decimal> {
        self.fields.get(code).and_then(parse_snapshot_value)
    }

    /// Whether any quote field has arrived.
    pub fn has_fields(&self) -> bool {
        [FIELD_LAST, FIELD_BID, FIELD_ASK, FIELD_DELTA]
            .iter()
            .any(|code| self.fields.contains_key(*code))
    }

    /// Convert to a domain quote. Missing sides read as zero.
    pub fn to_quote(&self) -> OptionQuote {
        let delta = self
            .fields
            .get(FIELD_DELTA)
            .and_then(parse_snapshot_value)
            .and_then(|d| rust_decimal::prelude::ToPrimitive::to_f64(&d));
        let quote = OptionQuote::new(
            self.decimal(FIELD_BID).unwrap_or(Decimal::ZERO),
            self.decimal(FIELD_ASK).unwrap_or(Decimal::ZERO),
            delta,
        );
        match self.decimal(FIELD_LAST) {
            Some(last) => quote.with_last(last),
            None => quote,
        }
    }
}

/// Response of `/iserver/marketdata/history`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryResponse {
    /// Bars, oldest first.
    #[serde(default)]
    pub data: Vec<HistoryBar>,
}

/// One history bar.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryBar {
    /// Open.
    pub o: f64,
    /// High.
    pub h: f64,
    /// Low.
    pub l: f64,
    /// Close.
    pub c: f64,
    /// Volume.
    #[serde(default)]
    pub v: f64,
    /// Bar time, epoch milliseconds.
    pub t: i64,
}

impl HistoryBar {
    /// Convert to a domain bar.
    pub fn to_bar(&self) -> Option<HistoricalBar> {
        Some(HistoricalBar {
            date: DateTime::from_timestamp_millis(self.t)?.date_naive(),
            open: Decimal::from_f64(self.o)?,
            high: Decimal::from_f64(self.h)?,
            low: Decimal::from_f64(self.l)?,
            close: Decimal::from_f64(self.c)?,
            volume: Decimal::from_f64(self.v)?,
        })
    }
}

/// Body of `/iserver/marketdata/unsubscribe`.
#[derive(Debug, Clone, Serialize)]
pub struct UnsubscribeRequest {
    /// Contract id to stop streaming.
    pub conid: i64,
}

// ============================================================================
// Portfolio Types
// ============================================================================

/// One entry of `/portfolio/{account}/positions/{page}`.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionEntry {
    /// Contract id.
    #[serde(deserialize_with = "de_conid")]
    pub conid: i64,
    /// Signed quantity.
    #[serde(default)]
    pub position: f64,
    /// Asset class (`OPT`, `STK`, ...).
    #[serde(rename = "assetClass", default)]
    pub asset_class: String,
    /// Underlying symbol.
    #[serde(rename = "undSym", default)]
    pub und_sym: Option<String>,
    /// Ticker.
    #[serde(default)]
    pub ticker: Option<String>,
    /// Strike.
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub strike: Option<f64>,
    /// Right (`P` / `C`).
    #[serde(rename = "putOrCall", default)]
    pub put_or_call: Option<String>,
    /// Expiry as `YYYYMMDD`.
    #[serde(default)]
    pub expiry: Option<String>,
    /// Contract multiplier.
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub multiplier: Option<f64>,
}

impl PositionEntry {
    /// Whether this is an option on `underlying`.
    pub fn is_option_on(&self, underlying: &Symbol) -> bool {
        self.asset_class == "OPT"
            && self
                .und_sym
                .as_deref()
                .or(self.ticker.as_deref())
                .is_some_and(|s| s.eq_ignore_ascii_case(underlying.as_str()))
    }

    /// Convert to a resolved domain contract.
    pub fn to_contract(&self, underlying: &Symbol, exchange: &str) -> Option<OptionContract> {
        let right = OptionRight::from_code(self.put_or_call.as_deref()?)?;
        let strike = self.strike.and_then(strike_decimal)?;
        let expiry = parse_gateway_date(self.expiry.as_deref()?)?;
        let mut contract = OptionContract::new(underlying.clone(), expiry, strike, right)
            .with_conid(self.conid)
            .with_exchange(exchange);
        if let Some(multiplier) = self.multiplier.filter(|m| *m >= 1.0) {
            contract = contract.with_multiplier(multiplier as u32);
        }
        Some(contract)
    }

    /// Signed whole-contract quantity.
    pub fn quantity(&self) -> i64 {
        self.position.round() as i64
    }
}

// ============================================================================
// Order Types
// ============================================================================

/// Body of `/iserver/account/{account}/orders`.
#[derive(Debug, Clone, Serialize)]
pub struct OrdersRequest {
    /// Orders to place.
    pub orders: Vec<OrderTicket>,
}

/// One order ticket.
#[derive(Debug, Clone, Serialize)]
pub struct OrderTicket {
    /// Account id.
    #[serde(rename = "acctId")]
    pub acct_id: String,
    /// Contract id.
    pub conid: i64,
    /// Client order id.
    #[serde(rename = "cOID")]
    pub client_order_id: String,
    /// Order type.
    #[serde(rename = "orderType")]
    pub order_type: String,
    /// Limit price.
    pub price: f64,
    /// `BUY` or `SELL`.
    pub side: String,
    /// Time in force.
    pub tif: String,
    /// Contracts.
    pub quantity: u64,
    /// Routing exchange.
    #[serde(rename = "listingExchange")]
    pub listing_exchange: String,
}

/// Body of `/iserver/reply/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyRequest {
    /// Accept the prompt.
    pub confirmed: bool,
}

/// One element of an order placement or reply response.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OrderReply {
    /// The order was accepted.
    Placed {
        /// Gateway order id.
        order_id: String,
        /// Status at acceptance.
        #[serde(default)]
        order_status: String,
    },
    /// The gateway wants a confirmation before routing.
    Prompt {
        /// Reply id.
        id: String,
        /// Prompt text.
        #[serde(default)]
        message: Vec<String>,
    },
    /// The order was refused.
    Error {
        /// Reason.
        error: String,
    },
}

/// Order placement response: a list of replies, or a bare error object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OrderSubmitResponse {
    /// Normal response.
    Replies(Vec<OrderReply>),
    /// Single object.
    Single(OrderReply),
}

impl OrderSubmitResponse {
    /// The first reply, if any.
    pub fn into_first(self) -> Option<OrderReply> {
        match self {
            Self::Replies(replies) => replies.into_iter().next(),
            Self::Single(reply) => Some(reply),
        }
    }
}

/// One entry of `/iserver/account/trades`.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeEntry {
    /// Ticker.
    #[serde(default)]
    pub symbol: String,
    /// `B` or `S`.
    #[serde(default)]
    pub side: String,
    /// Security type.
    #[serde(default)]
    pub sec_type: String,
    /// Execution venue; `--` or empty for non-exchange bookings.
    #[serde(default)]
    pub exchange: Option<String>,
    /// Trade time as `YYYYMMDD-HH:MM:SS`.
    #[serde(default)]
    pub trade_time: String,
}

impl TradeEntry {
    /// Whether this is stock delivered through a put assignment on `date`.
    pub fn is_assignment_of(&self, underlying: &Symbol, date: NaiveDate) -> bool {
        let off_exchange = self
            .exchange
            .as_deref()
            .map(str::trim)
            .is_none_or(|e| e.is_empty() || e == "--");
        self.sec_type == "STK"
            && self.symbol.eq_ignore_ascii_case(underlying.as_str())
            && matches!(self.side.as_str(), "B" | "BUY" | "BOT")
            && off_exchange
            && parse_gateway_date(&self.trade_time) == Some(date)
    }
}

/// Error body returned by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct IbkrErrorResponse {
    /// Error message.
    pub error: String,
}
