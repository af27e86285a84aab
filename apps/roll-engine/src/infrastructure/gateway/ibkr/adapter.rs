//! Client Portal gateway adapter implementing the session, market data and
//! execution ports.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::application::ports::{
    ExecutionError, ExecutionPort, GatewaySessionPort, MarketDataError, MarketDataPort,
    OrderConfirmation, OrderRequest, OrderState, QuoteTicket, SessionError, SessionInfo,
};
use crate::domain::archive::{BarSize, HistoricalBar};
use crate::domain::option_position::{OptionContract, OptionPosition, OptionQuote, OptionRight};
use crate::domain::shared::{BrokerOrderId, Symbol};

use super::api_types::{
    AccountsResponse, AuthStatusResponse, HistoryResponse, OrderReply, OrderSubmitResponse,
    OrderTicket, OrdersRequest, PositionEntry, ReplyRequest, SNAPSHOT_FIELDS, SecdefInfo,
    SecdefSearchEntry, SnapshotEntry, StrikesResponse, TradeEntry, UnsubscribeRequest,
    month_code,
};
use super::config::IbkrConfig;
use super::error::IbkrError;
use super::http_client::IbkrHttpClient;

/// Positions returned per portfolio page.
const POSITION_PAGE_SIZE: usize = 100;
/// Upper bound on portfolio pages read.
const MAX_POSITION_PAGES: u32 = 20;
/// Confirmation prompts answered before an order is given up.
const MAX_REPLY_ROUNDS: usize = 5;
/// The trades endpoint only looks back this many days.
const MAX_TRADE_DAYS: i64 = 7;

/// Underlying resolved through the contract search.
#[derive(Debug, Clone)]
struct UnderlyingListing {
    conid: i64,
    months: Vec<String>,
}

/// Background task that closes quote streams.
struct ReleaseWorker {
    tx: mpsc::UnboundedSender<i64>,
    handle: JoinHandle<()>,
}

/// Client Portal gateway adapter.
///
/// One instance owns the brokerage session for the whole process and serves
/// all three gateway-facing ports.
pub struct IbkrGatewayAdapter {
    client: IbkrHttpClient,
    config: IbkrConfig,
    underlying: Symbol,
    account_id: RwLock<Option<String>>,
    listings: Mutex<HashMap<Symbol, UnderlyingListing>>,
    subscriptions: Mutex<HashMap<u64, i64>>,
    next_ticket: AtomicU64,
    releaser: Mutex<Option<ReleaseWorker>>,
}

impl std::fmt::Debug for IbkrGatewayAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IbkrGatewayAdapter")
            .field("base_url", &self.config.base_url())
            .field("underlying", &self.underlying)
            .field("account_id", &*self.account_id.read())
            .field("open_subscriptions", &self.open_subscriptions())
            .finish_non_exhaustive()
    }
}

impl IbkrGatewayAdapter {
    /// Create a new adapter for `underlying`.
    pub fn new(config: IbkrConfig, underlying: Symbol) -> Result<Self, IbkrError> {
        let client = IbkrHttpClient::new(&config)?;
        Ok(Self {
            client,
            config,
            underlying,
            account_id: RwLock::new(None),
            listings: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(1),
            releaser: Mutex::new(None),
        })
    }

    /// Quote subscriptions not yet released.
    #[must_use]
    pub fn open_subscriptions(&self) -> usize {
        self.subscriptions.lock().len()
    }

    fn account(&self) -> Result<String, IbkrError> {
        self.account_id.read().clone().ok_or(IbkrError::NotConnected)
    }

    fn start_release_worker(&self) {
        let mut releaser = self.releaser.lock();
        if releaser.is_some() {
            return;
        }
        let (tx, mut rx) = mpsc::unbounded_channel::<i64>();
        let client = self.client.clone();
        let handle = tokio::spawn(async move {
            while let Some(conid) = rx.recv().await {
                let result: Result<serde_json::Value, IbkrError> = client
                    .post("/iserver/marketdata/unsubscribe", &UnsubscribeRequest { conid })
                    .await;
                match result {
                    Ok(_) => tracing::trace!(conid, "Quote stream closed"),
                    Err(e) => tracing::warn!(conid, error = %e, "Failed to close quote stream"),
                }
            }
        });
        *releaser = Some(ReleaseWorker { tx, handle });
    }

    /// Resolve (and cache) the underlying's contract id and option months.
    async fn listing(&self, underlying: &Symbol) -> Result<UnderlyingListing, IbkrError> {
        let cached = self.listings.lock().get(underlying).cloned();
        if let Some(listing) = cached {
            return Ok(listing);
        }

        let results: Vec<SecdefSearchEntry> = self
            .client
            .get_with_query(
                "/iserver/secdef/search",
                &[
                    ("symbol", underlying.as_str().to_string()),
                    ("secType", "STK".to_string()),
                ],
            )
            .await?;

        let entry = results
            .iter()
            .find(|e| e.symbol.eq_ignore_ascii_case(underlying.as_str()))
            .or_else(|| results.first())
            .ok_or_else(|| IbkrError::ContractNotFound {
                subject: underlying.to_string(),
            })?;

        let listing = UnderlyingListing {
            conid: entry.conid,
            months: entry.option_months(),
        };
        tracing::debug!(
            %underlying,
            conid = listing.conid,
            months = listing.months.len(),
            "Resolved underlying"
        );
        self.listings
            .lock()
            .insert(underlying.clone(), listing.clone());
        Ok(listing)
    }

    async fn strikes(
        &self,
        underlying_conid: i64,
        month: &str,
    ) -> Result<StrikesResponse, IbkrError> {
        self.client
            .get_with_query(
                "/iserver/secdef/strikes",
                &[
                    ("conid", underlying_conid.to_string()),
                    ("sectype", "OPT".to_string()),
                    ("month", month.to_string()),
                    ("exchange", self.config.exchange.clone()),
                ],
            )
            .await
    }

    async fn secdef_info(
        &self,
        underlying_conid: i64,
        month: &str,
        strike: Decimal,
        right: OptionRight,
    ) -> Result<Vec<SecdefInfo>, IbkrError> {
        self.client
            .get_with_query(
                "/iserver/secdef/info",
                &[
                    ("conid", underlying_conid.to_string()),
                    ("sectype", "OPT".to_string()),
                    ("month", month.to_string()),
                    ("strike", strike.normalize().to_string()),
                    ("right", right.code().to_string()),
                    ("exchange", self.config.exchange.clone()),
                ],
            )
            .await
    }

    /// Resolve a contract to the gateway's exact instrument.
    async fn resolve(&self, contract: &OptionContract) -> Result<OptionContract, IbkrError> {
        if contract.conid().is_some() {
            return Ok(contract.clone());
        }

        let listing = self.listing(contract.underlying()).await?;
        let infos = self
            .secdef_info(
                listing.conid,
                &month_code(contract.expiry()),
                contract.strike(),
                contract.right(),
            )
            .await?;

        infos
            .iter()
            .filter(|info| info.expiry() == Some(contract.expiry()))
            .find_map(|info| info.to_contract(contract.underlying(), &self.config.exchange))
            .ok_or_else(|| IbkrError::ContractNotFound {
                subject: contract.to_string(),
            })
    }

    async fn snapshot(&self, conid: i64) -> Result<Vec<SnapshotEntry>, IbkrError> {
        self.client
            .get_with_query(
                "/iserver/marketdata/snapshot",
                &[
                    ("conids", conid.to_string()),
                    ("fields", SNAPSHOT_FIELDS.to_string()),
                ],
            )
            .await
    }

    async fn submit(&self, account: &str, ticket: OrderTicket) -> Result<OrderReply, IbkrError> {
        let client_order_id = ticket.client_order_id.clone();
        let mut response: OrderSubmitResponse = self
            .client
            .post(
                &format!("/iserver/account/{account}/orders"),
                &OrdersRequest {
                    orders: vec![ticket],
                },
            )
            .await?;

        for _ in 0..MAX_REPLY_ROUNDS {
            match response.into_first() {
                Some(OrderReply::Prompt { id, message }) => {
                    tracing::warn!(
                        %client_order_id,
                        reply_id = %id,
                        prompt = %message.join(" | "),
                        "Confirming order prompt"
                    );
                    response = self
                        .client
                        .post(
                            &format!("/iserver/reply/{id}"),
                            &ReplyRequest { confirmed: true },
                        )
                        .await?;
                }
                Some(reply) => return Ok(reply),
                None => {
                    return Err(IbkrError::Api {
                        code: 200,
                        message: "empty order response".to_string(),
                    });
                }
            }
        }

        Err(IbkrError::OrderRejected(format!(
            "order {client_order_id} still awaiting confirmation after {MAX_REPLY_ROUNDS} prompts"
        )))
    }
}

#[async_trait]
impl GatewaySessionPort for IbkrGatewayAdapter {
    async fn connect(&self) -> Result<SessionInfo, SessionError> {
        tracing::info!(base_url = %self.config.base_url(), "Connecting to gateway");

        let status: AuthStatusResponse = self.client.get("/iserver/auth/status").await?;
        if !status.authenticated {
            let message = if status.message.is_empty() {
                format!(
                    "brokerage session not authenticated (connected: {}, competing: {})",
                    status.connected, status.competing
                )
            } else {
                status.message
            };
            return Err(IbkrError::NotAuthenticated(message).into());
        }

        let accounts: AccountsResponse = self.client.get("/iserver/accounts").await?;
        let account_id = accounts
            .resolve(&self.config.account_id)
            .ok_or(IbkrError::NoAccount)?;

        let listing = self.listing(&self.underlying).await?;

        *self.account_id.write() = Some(account_id.clone());
        self.start_release_worker();

        tracing::info!(
            %account_id,
            underlying = %self.underlying,
            underlying_conid = listing.conid,
            "Gateway session established"
        );

        Ok(SessionInfo {
            account_id,
            client_id: self.config.client_id,
        })
    }

    async fn disconnect(&self) -> Result<(), SessionError> {
        let worker = self.releaser.lock().take();
        let was_connected = self.account_id.write().take().is_some();

        if let Some(ReleaseWorker { tx, handle }) = worker {
            drop(tx);
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Release worker ended abnormally");
            }
        }

        let leaked = {
            let mut subscriptions = self.subscriptions.lock();
            let leaked = subscriptions.len();
            subscriptions.clear();
            leaked
        };
        if leaked > 0 {
            tracing::warn!(leaked, "Quote subscriptions still open at disconnect");
        }

        if !was_connected {
            return Ok(());
        }

        let _: serde_json::Value = self
            .client
            .get("/iserver/marketdata/unsubscribeall")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MarketDataPort for IbkrGatewayAdapter {
    async fn list_contracts(
        &self,
        underlying: &Symbol,
        right: OptionRight,
    ) -> Result<Vec<OptionContract>, MarketDataError> {
        let listing = self.listing(underlying).await?;
        let mut seen = HashSet::new();
        let mut contracts = Vec::new();

        for month in &listing.months {
            let strikes = match self.strikes(listing.conid, month).await {
                Ok(strikes) => strikes.for_right(right),
                Err(e) if e.is_connection_failure() => return Err(e.into()),
                Err(e) => {
                    tracing::debug!(%month, error = %e, "No strikes for month");
                    continue;
                }
            };

            for strike in strikes {
                match self.secdef_info(listing.conid, month, strike, right).await {
                    Ok(infos) => {
                        for info in infos {
                            if !seen.insert(info.conid) {
                                continue;
                            }
                            if let Some(contract) =
                                info.to_contract(underlying, &self.config.exchange)
                            {
                                contracts.push(contract);
                            }
                        }
                    }
                    Err(e) if e.is_connection_failure() => return Err(e.into()),
                    Err(e) => {
                        tracing::debug!(%month, %strike, error = %e, "No contract for strike");
                    }
                }
            }
        }

        Ok(contracts)
    }

    async fn chain_strikes(
        &self,
        underlying: &Symbol,
        expiry: NaiveDate,
    ) -> Result<Vec<Decimal>, MarketDataError> {
        let listing = self.listing(underlying).await?;
        let strikes = self.strikes(listing.conid, &month_code(expiry)).await?;
        Ok(strikes.union())
    }

    async fn subscribe_quote(
        &self,
        contract: &OptionContract,
    ) -> Result<QuoteTicket, MarketDataError> {
        let resolved = self.resolve(contract).await?;
        let conid = resolved.conid().ok_or_else(|| IbkrError::ContractNotFound {
            subject: contract.to_string(),
        })?;

        // The first snapshot call opens the stream; its fields are usually empty.
        self.snapshot(conid).await?;

        let id = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        self.subscriptions.lock().insert(id, conid);
        tracing::trace!(ticket = id, conid, contract = %resolved, "Quote stream opened");
        Ok(QuoteTicket::new(id, resolved))
    }

    async fn read_quote(&self, ticket: &QuoteTicket) -> Result<OptionQuote, MarketDataError> {
        let conid = self
            .subscriptions
            .lock()
            .get(&ticket.id())
            .copied()
            .ok_or_else(|| MarketDataError::Api {
                message: format!("unknown quote ticket {}", ticket.id()),
            })?;

        let entries = self.snapshot(conid).await?;
        let entry = entries
            .iter()
            .find(|e| e.conid == conid)
            .filter(|e| e.has_fields())
            .ok_or_else(|| {
                MarketDataError::unavailable(ticket.contract().to_string(), "no quote fields")
            })?;
        Ok(entry.to_quote())
    }

    fn release_quote(&self, ticket: QuoteTicket) {
        let conid = {
            let mut subscriptions = self.subscriptions.lock();
            let Some(conid) = subscriptions.remove(&ticket.id()) else {
                tracing::debug!(ticket = ticket.id(), "Quote ticket already released");
                return;
            };
            if subscriptions.values().any(|c| *c == conid) {
                return;
            }
            conid
        };

        match self.releaser.lock().as_ref() {
            Some(worker) => {
                if worker.tx.send(conid).is_err() {
                    tracing::warn!(conid, "Release worker stopped, stream left open");
                }
            }
            None => tracing::debug!(conid, "No session, stream closes with the gateway"),
        }
    }

    async fn historical_bars(
        &self,
        contract: &OptionContract,
        start: NaiveDate,
        end: NaiveDate,
        bar_size: BarSize,
    ) -> Result<Vec<HistoricalBar>, MarketDataError> {
        let resolved = self.resolve(contract).await?;
        let conid = resolved.conid().ok_or_else(|| IbkrError::ContractNotFound {
            subject: contract.to_string(),
        })?;
        let days = (end - start).num_days().max(0) + 1;

        // The gateway counts `period` back from `startTime`.
        let response: HistoryResponse = self
            .client
            .get_with_query(
                "/iserver/marketdata/history",
                &[
                    ("conid", conid.to_string()),
                    ("period", format!("{days}d")),
                    ("bar", bar_size.code().to_string()),
                    ("startTime", end.format("%Y%m%d-23:59:59").to_string()),
                ],
            )
            .await?;

        Ok(response
            .data
            .iter()
            .filter_map(|bar| bar.to_bar())
            .filter(|bar| bar.date >= start && bar.date <= end)
            .collect())
    }
}

#[async_trait]
impl ExecutionPort for IbkrGatewayAdapter {
    async fn positions(&self, underlying: &Symbol) -> Result<Vec<OptionPosition>, ExecutionError> {
        let account = self.account()?;
        let mut positions = Vec::new();

        for page in 0..MAX_POSITION_PAGES {
            let entries: Vec<PositionEntry> = self
                .client
                .get(&format!("/portfolio/{account}/positions/{page}"))
                .await?;
            let count = entries.len();

            for entry in entries
                .iter()
                .filter(|e| e.is_option_on(underlying) && e.quantity() != 0)
            {
                match entry.to_contract(underlying, &self.config.exchange) {
                    Some(contract) => {
                        positions.push(OptionPosition::new(contract, entry.quantity()));
                    }
                    None => tracing::warn!(conid = entry.conid, "Unparseable option position"),
                }
            }

            if count < POSITION_PAGE_SIZE {
                break;
            }
        }

        tracing::debug!(%underlying, count = positions.len(), "Loaded option positions");
        Ok(positions)
    }

    async fn place_order(
        &self,
        request: OrderRequest,
    ) -> Result<OrderConfirmation, ExecutionError> {
        let account = self.account()?;
        let resolved = self
            .resolve(&request.contract)
            .await
            .map_err(ExecutionError::from)?;
        let conid = resolved.conid().ok_or_else(|| IbkrError::ContractNotFound {
            subject: request.contract.to_string(),
        })?;
        let price = request
            .limit_price
            .amount()
            .to_f64()
            .ok_or_else(|| ExecutionError::OrderRejected {
                reason: format!("limit price {} not representable", request.limit_price),
            })?;

        let ticket = OrderTicket {
            acct_id: account.clone(),
            conid,
            client_order_id: request.client_order_id.as_str().to_string(),
            order_type: "LMT".to_string(),
            price,
            side: request.side.to_string(),
            tif: "DAY".to_string(),
            quantity: request.quantity,
            listing_exchange: self.config.exchange.clone(),
        };

        tracing::info!(
            client_order_id = %request.client_order_id,
            contract = %resolved,
            side = %request.side,
            quantity = request.quantity,
            limit_price = %request.limit_price,
            "Submitting order to gateway"
        );

        match self.submit(&account, ticket).await? {
            OrderReply::Placed {
                order_id,
                order_status,
            } => {
                let state = if order_status.trim().is_empty() {
                    OrderState::Submitted
                } else {
                    OrderState::from_gateway(&order_status)
                };
                tracing::info!(
                    client_order_id = %request.client_order_id,
                    broker_order_id = %order_id,
                    state = ?state,
                    "Order accepted"
                );
                Ok(OrderConfirmation {
                    order_id: BrokerOrderId::new(order_id),
                    client_order_id: request.client_order_id,
                    state,
                })
            }
            OrderReply::Error { error } => Err(ExecutionError::OrderRejected { reason: error }),
            OrderReply::Prompt { id, .. } => Err(ExecutionError::Api {
                message: format!("unanswered prompt {id}"),
            }),
        }
    }

    async fn assignment_history(
        &self,
        underlying: &Symbol,
        date: NaiveDate,
    ) -> Result<bool, ExecutionError> {
        self.account()?;
        // Local, like the evaluation date the binary defaults to.
        let today = chrono::Local::now().date_naive();
        let (days, covered) = trade_window(today, date);
        if !covered {
            tracing::warn!(
                %date,
                %today,
                window_days = days,
                "Assignment date is outside the gateway's trade history window"
            );
        }

        let trades: Vec<TradeEntry> = self
            .client
            .get_with_query("/iserver/account/trades", &[("days", days.to_string())])
            .await?;

        let assigned = trades.iter().any(|t| t.is_assignment_of(underlying, date));
        tracing::debug!(%underlying, %date, trades = trades.len(), assigned, "Checked assignments");
        Ok(assigned)
    }
}

/// Lookback in days for the trades endpoint so that it reaches `date` as seen
/// from `today`, and whether `date` falls inside the served window at all.
fn trade_window(today: NaiveDate, date: NaiveDate) -> (i64, bool) {
    let age = (today - date).num_days();
    (
        (age + 1).clamp(1, MAX_TRADE_DAYS),
        (0..MAX_TRADE_DAYS).contains(&age),
    )
}
