//! Scripted in-memory gateway shared by the integration tests.
//!
//! One `MockGateway` plays session, market data and execution at once, the way
//! the real Client Portal adapter does, and records every call it receives.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use roll_engine::application::ports::{
    ExecutionError, ExecutionPort, GatewaySessionPort, MarketDataError, MarketDataPort,
    OrderConfirmation, OrderRequest, OrderState, QuoteTicket, SessionError, SessionInfo,
};
use roll_engine::domain::archive::{BarSize, HistoricalBar};
use roll_engine::domain::shared::{BrokerOrderId, Symbol};
use roll_engine::{OptionContract, OptionPosition, OptionQuote, OptionRight};

/// Parse a `YYYY-MM-DD` literal.
pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid test date")
}

/// Everything the mock saw.
#[derive(Debug, Default)]
pub struct Calls {
    pub connects: usize,
    pub disconnects: usize,
    pub subscribed: Vec<OptionContract>,
    pub released: usize,
    pub orders: Vec<OrderRequest>,
    pub assignment_checks: Vec<NaiveDate>,
    pub history_requests: Vec<(OptionContract, NaiveDate, NaiveDate)>,
}

/// Scripted gateway.
#[derive(Default)]
pub struct MockGateway {
    connect_error: Option<SessionError>,
    strikes: Vec<Decimal>,
    deltas: HashMap<Decimal, f64>,
    quotes: HashMap<Decimal, OptionQuote>,
    positions: Vec<OptionPosition>,
    assigned: bool,
    fail_order_at: Option<usize>,
    contracts: Vec<OptionContract>,
    contracts_error: Option<MarketDataError>,
    positions_error: Option<ExecutionError>,
    bars: Vec<HistoricalBar>,
    next_ticket: AtomicU64,
    calls: Mutex<Calls>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listed strikes with the delta each one quotes (sign is forced negative).
    pub fn with_chain(mut self, chain: &[(Decimal, f64)]) -> Self {
        self.strikes = chain.iter().map(|(strike, _)| *strike).collect();
        self.deltas = chain.iter().map(|(strike, delta)| (*strike, -delta.abs())).collect();
        self
    }

    /// Quote `strike` with a fixed market instead of the chain default.
    pub fn quoting(mut self, strike: Decimal, quote: OptionQuote) -> Self {
        self.quotes.insert(strike, quote);
        self
    }

    pub fn with_positions(mut self, positions: Vec<OptionPosition>) -> Self {
        self.positions = positions;
        self
    }

    pub const fn assigned(mut self) -> Self {
        self.assigned = true;
        self
    }

    /// Reject the `index`-th order (0-based) and every one after it.
    pub const fn failing_order_at(mut self, index: usize) -> Self {
        self.fail_order_at = Some(index);
        self
    }

    pub fn failing_connect(mut self, error: SessionError) -> Self {
        self.connect_error = Some(error);
        self
    }

    pub fn failing_contracts_with(mut self, error: MarketDataError) -> Self {
        self.contracts_error = Some(error);
        self
    }

    pub fn failing_positions_with(mut self, error: ExecutionError) -> Self {
        self.positions_error = Some(error);
        self
    }

    pub fn with_history(
        mut self,
        contracts: Vec<OptionContract>,
        bars: Vec<HistoricalBar>,
    ) -> Self {
        self.contracts = contracts;
        self.bars = bars;
        self
    }

    pub fn calls(&self) -> parking_lot::MutexGuard<'_, Calls> {
        self.calls.lock()
    }

    /// Subscriptions opened and never released.
    pub fn leaked(&self) -> usize {
        let calls = self.calls.lock();
        calls.subscribed.len() - calls.released
    }

    fn quote_for(&self, contract: &OptionContract) -> OptionQuote {
        if let Some(quote) = self.quotes.get(&contract.strike()) {
            return *quote;
        }
        match self.deltas.get(&contract.strike()) {
            Some(delta) => OptionQuote::new(dec!(1.10), dec!(1.30), Some(*delta)),
            None => OptionQuote::new(dec!(2.00), dec!(2.40), None),
        }
    }
}

/// A daily bar with distinct high, low and close.
pub fn bar(
    day: &str,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
) -> HistoricalBar {
    HistoricalBar {
        date: date(day),
        open: close,
        high,
        low,
        close,
        volume,
    }
}

/// `MSTR` put.
pub fn put(expiry: &str, strike: Decimal) -> OptionContract {
    OptionContract::put(Symbol::new("MSTR"), date(expiry), strike)
}

#[async_trait]
impl GatewaySessionPort for MockGateway {
    async fn connect(&self) -> Result<SessionInfo, SessionError> {
        self.calls.lock().connects += 1;
        if let Some(error) = &self.connect_error {
            return Err(error.clone());
        }
        Ok(SessionInfo {
            account_id: "DU1234567".to_string(),
            client_id: 123,
        })
    }

    async fn disconnect(&self) -> Result<(), SessionError> {
        self.calls.lock().disconnects += 1;
        Ok(())
    }
}

#[async_trait]
impl MarketDataPort for MockGateway {
    async fn list_contracts(
        &self,
        _underlying: &Symbol,
        right: OptionRight,
    ) -> Result<Vec<OptionContract>, MarketDataError> {
        if let Some(error) = &self.contracts_error {
            return Err(error.clone());
        }
        Ok(self
            .contracts
            .iter()
            .filter(|c| c.right() == right)
            .cloned()
            .collect())
    }

    async fn chain_strikes(
        &self,
        underlying: &Symbol,
        expiry: NaiveDate,
    ) -> Result<Vec<Decimal>, MarketDataError> {
        if self.strikes.is_empty() {
            return Err(MarketDataError::unavailable(
                format!("{underlying} {}", expiry.format("%Y%m%d")),
                "no chain",
            ));
        }
        // Descending on purpose: the selector must sort.
        let mut strikes = self.strikes.clone();
        strikes.reverse();
        Ok(strikes)
    }

    async fn subscribe_quote(
        &self,
        contract: &OptionContract,
    ) -> Result<QuoteTicket, MarketDataError> {
        let id = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().subscribed.push(contract.clone());
        Ok(QuoteTicket::new(id, contract.clone().with_conid(700_000 + id as i64)))
    }

    async fn read_quote(&self, ticket: &QuoteTicket) -> Result<OptionQuote, MarketDataError> {
        Ok(self.quote_for(ticket.contract()))
    }

    fn release_quote(&self, _ticket: QuoteTicket) {
        self.calls.lock().released += 1;
    }

    async fn historical_bars(
        &self,
        contract: &OptionContract,
        start: NaiveDate,
        end: NaiveDate,
        _bar_size: BarSize,
    ) -> Result<Vec<HistoricalBar>, MarketDataError> {
        self.calls
            .lock()
            .history_requests
            .push((contract.clone(), start, end));
        let bars: Vec<HistoricalBar> = self
            .bars
            .iter()
            .filter(|b| b.date >= start && b.date <= end)
            .copied()
            .collect();
        if bars.is_empty() {
            return Err(MarketDataError::unavailable(contract.to_string(), "no data"));
        }
        Ok(bars)
    }
}

#[async_trait]
impl ExecutionPort for MockGateway {
    async fn positions(&self, _underlying: &Symbol) -> Result<Vec<OptionPosition>, ExecutionError> {
        if let Some(error) = &self.positions_error {
            return Err(error.clone());
        }
        Ok(self.positions.clone())
    }

    async fn place_order(
        &self,
        request: OrderRequest,
    ) -> Result<OrderConfirmation, ExecutionError> {
        let mut calls = self.calls.lock();
        let index = calls.orders.len();
        calls.orders.push(request.clone());
        if self.fail_order_at.is_some_and(|at| index >= at) {
            return Err(ExecutionError::OrderRejected {
                reason: "insufficient buying power".to_string(),
            });
        }
        Ok(OrderConfirmation {
            order_id: BrokerOrderId::new(format!("{}", 1_000 + index)),
            client_order_id: request.client_order_id,
            state: OrderState::Submitted,
        })
    }

    async fn assignment_history(
        &self,
        _underlying: &Symbol,
        date: NaiveDate,
    ) -> Result<bool, ExecutionError> {
        self.calls.lock().assignment_checks.push(date);
        Ok(self.assigned)
    }
}
