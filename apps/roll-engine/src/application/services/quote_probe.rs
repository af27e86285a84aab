//! Quote Probe
//!
//! Scoped quote acquisition: subscribe, let the stream settle, read, release.
//! The release is tied to [`QuoteSubscription`]'s `Drop`, so it happens exactly
//! once whether the probe returns a quote, an error or is cancelled mid-wait.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::application::ports::{MarketDataError, MarketDataPort, QuoteTicket};
use crate::domain::option_position::{OptionContract, OptionQuote};

/// Default wait between subscribing and reading a quote.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// An open quote subscription, released on drop.
pub struct QuoteSubscription<'a, M: MarketDataPort + ?Sized> {
    port: &'a M,
    ticket: QuoteTicket,
}

impl<'a, M: MarketDataPort + ?Sized> QuoteSubscription<'a, M> {
    /// Take ownership of `ticket`.
    pub const fn new(port: &'a M, ticket: QuoteTicket) -> Self {
        Self { port, ticket }
    }

    /// The held ticket.
    pub const fn ticket(&self) -> &QuoteTicket {
        &self.ticket
    }
}

impl<M: MarketDataPort + ?Sized> Drop for QuoteSubscription<'_, M> {
    fn drop(&mut self) {
        tracing::trace!(
            ticket = self.ticket.id(),
            contract = %self.ticket.contract(),
            "Releasing quote"
        );
        self.port.release_quote(self.ticket.clone());
    }
}

/// A quote together with the contract as the gateway resolved it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbedQuote {
    /// Resolved contract (carries the broker's conid and local symbol).
    pub contract: OptionContract,
    /// Quote read after the settle delay.
    pub quote: OptionQuote,
}

/// Reads one quote per call through a scoped subscription.
pub struct QuoteProbe<M: MarketDataPort + ?Sized> {
    market_data: Arc<M>,
    settle_delay: Duration,
    cancel: CancellationToken,
}

impl<M: MarketDataPort + ?Sized> Clone for QuoteProbe<M> {
    fn clone(&self) -> Self {
        Self {
            market_data: Arc::clone(&self.market_data),
            settle_delay: self.settle_delay,
            cancel: self.cancel.clone(),
        }
    }
}

impl<M: MarketDataPort + ?Sized> QuoteProbe<M> {
    /// Create a probe that waits `settle_delay` before each read.
    pub const fn new(
        market_data: Arc<M>,
        settle_delay: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            market_data,
            settle_delay,
            cancel,
        }
    }

    /// The market data port behind this probe.
    pub fn market_data(&self) -> &M {
        &self.market_data
    }

    /// Subscribe, wait, read and release.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` when the token fires before or during the settle
    /// delay, or any error from the port.
    pub async fn probe(&self, contract: &OptionContract) -> Result<ProbedQuote, MarketDataError> {
        if self.cancel.is_cancelled() {
            return Err(MarketDataError::Cancelled);
        }

        let ticket = self.market_data.subscribe_quote(contract).await?;
        let subscription = QuoteSubscription::new(self.market_data.as_ref(), ticket);

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(MarketDataError::Cancelled),
            () = tokio::time::sleep(self.settle_delay) => {}
        }

        let quote = self.market_data.read_quote(subscription.ticket()).await?;
        Ok(ProbedQuote {
            contract: subscription.ticket().contract().clone(),
            quote,
        })
    }

    /// Probe a contract to price a buy; a quote with no offer is unusable.
    ///
    /// # Errors
    ///
    /// Returns `DataUnavailable` when the ask is missing, plus any error
    /// from [`Self::probe`].
    pub async fn price(&self, contract: &OptionContract) -> Result<ProbedQuote, MarketDataError> {
        let probed = self.probe(contract).await?;
        if !probed.quote.has_offer() {
            return Err(MarketDataError::unavailable(
                contract.to_string(),
                format!(
                    "no offer (bid {}, ask {})",
                    probed.quote.bid, probed.quote.ask
                ),
            ));
        }
        Ok(probed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::domain::archive::{BarSize, HistoricalBar};
    use crate::domain::option_position::OptionRight;
    use crate::domain::shared::Symbol;

    #[derive(Default)]
    struct MockMarketData {
        next_id: AtomicU64,
        subscribed: AtomicUsize,
        released: AtomicUsize,
        fail_read: bool,
        quote: Option<OptionQuote>,
    }

    impl MockMarketData {
        fn with_quote(quote: OptionQuote) -> Self {
            Self {
                quote: Some(quote),
                ..Self::default()
            }
        }

        fn open(&self) -> usize {
            self.subscribed.load(Ordering::SeqCst) - self.released.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MarketDataPort for MockMarketData {
        async fn list_contracts(
            &self,
            _underlying: &Symbol,
            _right: OptionRight,
        ) -> Result<Vec<OptionContract>, MarketDataError> {
            Ok(vec![])
        }

        async fn chain_strikes(
            &self,
            _underlying: &Symbol,
            _expiry: NaiveDate,
        ) -> Result<Vec<Decimal>, MarketDataError> {
            Ok(vec![])
        }

        async fn subscribe_quote(
            &self,
            contract: &OptionContract,
        ) -> Result<QuoteTicket, MarketDataError> {
            self.subscribed.fetch_add(1, Ordering::SeqCst);
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            Ok(QuoteTicket::new(id, contract.clone().with_conid(42)))
        }

        async fn read_quote(&self, ticket: &QuoteTicket) -> Result<OptionQuote, MarketDataError> {
            if self.fail_read {
                return Err(MarketDataError::unavailable(ticket.contract().to_string(), "boom"));
            }
            Ok(self
                .quote
                .unwrap_or_else(|| OptionQuote::new(dec!(1.00), dec!(1.20), Some(-0.2))))
        }

        fn release_quote(&self, _ticket: QuoteTicket) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }

        async fn historical_bars(
            &self,
            _contract: &OptionContract,
            _start: NaiveDate,
            _end: NaiveDate,
            _bar_size: BarSize,
        ) -> Result<Vec<HistoricalBar>, MarketDataError> {
            Ok(vec![])
        }
    }

    fn contract() -> OptionContract {
        OptionContract::put(
            Symbol::new("MSTR"),
            NaiveDate::from_ymd_opt(2025, 2, 15).unwrap(),
            dec!(90),
        )
    }

    fn probe(port: Arc<MockMarketData>, cancel: CancellationToken) -> QuoteProbe<MockMarketData> {
        QuoteProbe::new(port, Duration::from_millis(1), cancel)
    }

    #[tokio::test]
    async fn probe_reads_and_releases() {
        let port = Arc::new(MockMarketData::default());
        let probed = probe(Arc::clone(&port), CancellationToken::new())
            .probe(&contract())
            .await
            .unwrap();

        assert_eq!(probed.quote.mid().amount(), dec!(1.10));
        assert_eq!(probed.contract.conid(), Some(42));
        assert_eq!(port.open(), 0);
        assert_eq!(port.released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn probe_releases_on_read_error() {
        let port = Arc::new(MockMarketData {
            fail_read: true,
            ..MockMarketData::default()
        });
        let result = probe(Arc::clone(&port), CancellationToken::new())
            .probe(&contract())
            .await;

        assert!(matches!(result, Err(MarketDataError::DataUnavailable { .. })));
        assert_eq!(port.open(), 0);
    }

    #[tokio::test]
    async fn probe_releases_on_cancel_during_settle() {
        let port = Arc::new(MockMarketData::default());
        let cancel = CancellationToken::new();
        let probe = QuoteProbe::new(Arc::clone(&port), Duration::from_secs(60), cancel.clone());

        let handle = tokio::spawn(async move { probe.probe(&contract()).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(MarketDataError::Cancelled)));
        assert_eq!(port.subscribed.load(Ordering::SeqCst), 1);
        assert_eq!(port.open(), 0);
    }

    #[tokio::test]
    async fn probe_does_not_subscribe_when_already_cancelled() {
        let port = Arc::new(MockMarketData::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = probe(Arc::clone(&port), cancel).probe(&contract()).await;
        assert!(matches!(result, Err(MarketDataError::Cancelled)));
        assert_eq!(port.subscribed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn price_accepts_zero_bid() {
        let port = Arc::new(MockMarketData::with_quote(OptionQuote::new(
            dec!(0),
            dec!(0.05),
            Some(-0.01),
        )));
        let probed = probe(Arc::clone(&port), CancellationToken::new())
            .price(&contract())
            .await
            .unwrap();

        assert_eq!(probed.quote.buy_limit().amount(), dec!(0.02));
        assert_eq!(port.open(), 0);
    }

    #[tokio::test]
    async fn price_rejects_missing_offer() {
        let port = Arc::new(MockMarketData::with_quote(OptionQuote::new(
            dec!(0.05),
            dec!(0),
            Some(-0.01),
        )));
        let result = probe(Arc::clone(&port), CancellationToken::new())
            .price(&contract())
            .await;

        assert!(matches!(result, Err(MarketDataError::DataUnavailable { .. })));
        assert_eq!(port.open(), 0);
    }
}
