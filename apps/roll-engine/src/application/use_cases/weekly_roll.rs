//! Weekly Roll Use Case
//!
//! Buy back every held short put on the underlying, then sell a
//! delta-targeted put expiring a week out. Each close must be confirmed
//! before the next order goes out, and the replacement is only sold once
//! every close is confirmed.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use super::order_placement::{OpenOutcome, OrderPlacer, RollSettings};
use crate::application::ports::{ExecutionPort, MarketDataPort};
use crate::domain::rolling::{
    OpenIntent, RollAction, RollEvent, RollKind, RollPlanner, RollReport, RollState,
    RollStateMachine,
};
use crate::error::RollEngineError;

/// Use case for the weekly close-and-reopen roll.
pub struct WeeklyRollUseCase<M, E>
where
    M: MarketDataPort + ?Sized,
    E: ExecutionPort + ?Sized,
{
    execution: Arc<E>,
    orders: OrderPlacer<M, E>,
    planner: RollPlanner,
    settings: RollSettings,
}

impl<M, E> WeeklyRollUseCase<M, E>
where
    M: MarketDataPort + ?Sized,
    E: ExecutionPort + ?Sized,
{
    /// Create a new `WeeklyRollUseCase`.
    pub fn new(
        market_data: Arc<M>,
        execution: Arc<E>,
        settings: RollSettings,
        cancel: CancellationToken,
    ) -> Self {
        let orders = OrderPlacer::new(market_data, Arc::clone(&execution), &settings, cancel);
        Self {
            execution,
            orders,
            planner: RollPlanner::new(settings.policy),
            settings,
        }
    }

    /// Run the weekly roll for `today`.
    ///
    /// Ends in `WEEKLY_EXECUTED` if any order was confirmed, otherwise `IDLE`.
    ///
    /// # Errors
    ///
    /// A failure before any close is confirmed is returned as-is. A failure
    /// after at least one confirmed close is a `PartialRollFailure` carrying
    /// the confirmed closes.
    pub async fn execute(
        &self,
        today: NaiveDate,
        machine: &mut RollStateMachine,
    ) -> Result<RollReport, RollEngineError> {
        machine.begin_weekly()?;
        let mut report = RollReport::new(RollKind::Weekly);

        let outcome = self.run(today, &mut report).await;

        let next = if report.order_count() > 0 {
            RollState::WeeklyExecuted
        } else {
            RollState::Idle
        };
        machine.transition(next)?;
        report.final_state = machine.state();

        match outcome {
            Ok(()) => Ok(report),
            Err(e) if report.closes().next().is_some() => {
                let closed: Vec<RollEvent> = report.closes().cloned().collect();
                tracing::error!(
                    closed = closed.len(),
                    error = %e,
                    "Weekly roll partially failed: closes confirmed but no replacement opened"
                );
                Err(RollEngineError::PartialRollFailure {
                    kind: RollKind::Weekly,
                    closed,
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn run(&self, today: NaiveDate, report: &mut RollReport) -> Result<(), RollEngineError> {
        let positions = self.execution.positions(&self.settings.underlying).await?;
        let actions = self
            .planner
            .plan_weekly(today, &self.settings.underlying, &positions);

        let closes = actions
            .iter()
            .filter(|a| matches!(a, RollAction::Close { .. }))
            .count();
        tracing::info!(%today, positions = positions.len(), closes, "Weekly roll due");

        for action in actions {
            match action {
                RollAction::Close { position } => {
                    let event = self
                        .orders
                        .close(RollKind::Weekly, today, &position)
                        .await?;
                    report.events.push(event);
                }
                RollAction::Open(intent) => self.open(today, &intent, report).await?,
                RollAction::Skip { reason, .. } => report.skips.push(reason),
            }
        }
        Ok(())
    }

    async fn open(
        &self,
        today: NaiveDate,
        intent: &OpenIntent,
        report: &mut RollReport,
    ) -> Result<(), RollEngineError> {
        match self
            .orders
            .open_by_delta(&self.settings.underlying, today, intent)
            .await?
        {
            OpenOutcome::Opened(event) => report.events.push(event),
            OpenOutcome::Skipped(reason) => {
                tracing::warn!(
                    reason = %reason,
                    closed = report.closes().count(),
                    "Skipping weekly open, position left flat"
                );
                report.skips.push(reason);
            }
        }
        Ok(())
    }
}
