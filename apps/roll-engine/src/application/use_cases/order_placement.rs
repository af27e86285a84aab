//! Order placement shared by the roll use cases.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{ExecutionError, ExecutionPort, MarketDataPort, OrderRequest};
use crate::application::services::{DEFAULT_SETTLE_DELAY, QuoteProbe, StrikeSearch, StrikeSelector};
use crate::domain::option_position::{OptionContract, OptionPosition, OptionQuote};
use crate::domain::rolling::{
    EarningsCalendar, OpenIntent, RollEvent, RollKind, RollPolicy, SkipReason,
};
use crate::domain::shared::{ClientOrderId, Money, OrderSide, Symbol};
use crate::error::RollEngineError;

/// Settings shared by the monthly and weekly rolls.
#[derive(Debug, Clone)]
pub struct RollSettings {
    /// Underlying whose puts are rolled.
    pub underlying: Symbol,
    /// Strike and timing parameters.
    pub policy: RollPolicy,
    /// Known earnings dates.
    pub calendar: EarningsCalendar,
    /// Client id tagged on order ids.
    pub client_id: u32,
    /// Wait between subscribing to a quote and reading it.
    pub settle_delay: Duration,
}

impl RollSettings {
    /// Settings with the default policy and settle delay.
    pub fn new(underlying: Symbol, calendar: EarningsCalendar, client_id: u32) -> Self {
        Self {
            underlying,
            policy: RollPolicy::default(),
            calendar,
            client_id,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Result of trying to sell a delta-selected option.
#[derive(Debug)]
pub(crate) enum OpenOutcome {
    Opened(RollEvent),
    Skipped(SkipReason),
}

/// Prices and places roll orders, one confirmed order at a time.
pub(crate) struct OrderPlacer<M: MarketDataPort + ?Sized, E: ExecutionPort + ?Sized> {
    execution: Arc<E>,
    probe: QuoteProbe<M>,
    client_id: u32,
}

impl<M: MarketDataPort + ?Sized, E: ExecutionPort + ?Sized> OrderPlacer<M, E> {
    pub(crate) fn new(
        market_data: Arc<M>,
        execution: Arc<E>,
        settings: &RollSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            execution,
            probe: QuoteProbe::new(market_data, settings.settle_delay, cancel),
            client_id: settings.client_id,
        }
    }

    /// Search for the intent's strike and sell it if one is found.
    pub(crate) async fn open_by_delta(
        &self,
        underlying: &Symbol,
        today: NaiveDate,
        intent: &OpenIntent,
    ) -> Result<OpenOutcome, RollEngineError> {
        let search = StrikeSelector::new(underlying.clone(), self.probe.clone())
            .find_target_strike(intent.expiry, intent.target_delta, intent.right)
            .await?;

        match search {
            StrikeSearch::Found {
                contract, quote, ..
            } => {
                let event = self
                    .open(intent.kind, today, &contract, &quote, intent.quantity)
                    .await?;
                Ok(OpenOutcome::Opened(event))
            }
            StrikeSearch::NotFound { probes } => Ok(OpenOutcome::Skipped(
                SkipReason::NoStrikeMeetsDelta {
                    expiry: intent.expiry,
                    right: intent.right,
                    target_delta: intent.target_delta,
                    probes,
                },
            )),
        }
    }

    /// Buy back the full size of `position` at the live midpoint. A zero bid
    /// is accepted; the ask is used when the midpoint rounds to zero.
    pub(crate) async fn close(
        &self,
        kind: RollKind,
        today: NaiveDate,
        position: &OptionPosition,
    ) -> Result<RollEvent, RollEngineError> {
        let probed = self.probe.price(&position.contract).await?;
        self.place(
            kind,
            today,
            &probed.contract,
            probed.quote.buy_limit(),
            OrderSide::Buy,
            position.close_quantity(),
        )
        .await
    }

    /// Sell `quantity` of a contract picked by the strike selector, priced
    /// from the quote read during the search.
    async fn open(
        &self,
        kind: RollKind,
        today: NaiveDate,
        contract: &OptionContract,
        quote: &OptionQuote,
        quantity: u64,
    ) -> Result<RollEvent, RollEngineError> {
        if !quote.has_market() {
            return Err(RollEngineError::DataUnavailable {
                subject: contract.to_string(),
                message: format!("no market (bid {}, ask {})", quote.bid, quote.ask),
            });
        }
        self.place(kind, today, contract, quote.mid(), OrderSide::Sell, quantity)
            .await
    }

    async fn place(
        &self,
        kind: RollKind,
        today: NaiveDate,
        contract: &OptionContract,
        limit_price: Money,
        side: OrderSide,
        quantity: u64,
    ) -> Result<RollEvent, RollEngineError> {
        limit_price.validate_limit_price()?;

        let client_order_id = ClientOrderId::generate(self.client_id);
        let request = OrderRequest::limit(
            client_order_id.clone(),
            contract.clone(),
            side,
            quantity,
            limit_price,
        );

        tracing::debug!(
            %kind,
            %client_order_id,
            contract = %contract,
            %side,
            quantity,
            %limit_price,
            "Placing limit order"
        );

        let confirmation = self.execution.place_order(request).await?;
        if !confirmation.state.is_confirmed() {
            return Err(ExecutionError::Unconfirmed {
                client_order_id: client_order_id.to_string(),
                state: confirmation.state,
            }
            .into());
        }

        let event = match side {
            OrderSide::Buy => RollEvent::closed(
                kind,
                today,
                contract.clone(),
                quantity,
                limit_price,
                confirmation.order_id,
            ),
            OrderSide::Sell => RollEvent::opened(
                kind,
                today,
                contract.clone(),
                quantity,
                limit_price,
                confirmation.order_id,
            ),
        };

        tracing::info!(
            order_id = %event.order_id,
            contract = %contract.display_symbol(),
            %limit_price,
            "{event}"
        );
        Ok(event)
    }
}
