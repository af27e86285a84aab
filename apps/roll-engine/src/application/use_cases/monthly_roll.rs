//! Monthly Roll Use Case
//!
//! After an assignment on the most recent earnings date, sell a delta-targeted
//! put expiring a fixed number of days after that date.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use super::order_placement::{OpenOutcome, OrderPlacer, RollSettings};
use crate::application::ports::{ExecutionPort, MarketDataPort};
use crate::domain::rolling::{
    OpenIntent, RollAction, RollKind, RollPlanner, RollReport, RollState, RollStateMachine,
};
use crate::error::RollEngineError;

/// Use case for the post-earnings monthly roll.
pub struct MonthlyRollUseCase<M, E>
where
    M: MarketDataPort + ?Sized,
    E: ExecutionPort + ?Sized,
{
    execution: Arc<E>,
    orders: OrderPlacer<M, E>,
    planner: RollPlanner,
    settings: RollSettings,
}

impl<M, E> MonthlyRollUseCase<M, E>
where
    M: MarketDataPort + ?Sized,
    E: ExecutionPort + ?Sized,
{
    /// Create a new `MonthlyRollUseCase`.
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

    /// Run the monthly check for `today`.
    ///
    /// Leaves `machine` in `IDLE` or `MONTHLY_EXECUTED`, including when an
    /// error is returned.
    pub async fn execute(
        &self,
        today: NaiveDate,
        machine: &mut RollStateMachine,
    ) -> Result<RollReport, RollEngineError> {
        let mut report = RollReport::new(RollKind::Monthly);

        let prior = self.planner.monthly_anchor(today, &self.settings.calendar);
        let assigned = match prior {
            Some(date) => {
                self.execution
                    .assignment_history(&self.settings.underlying, date)
                    .await?
            }
            None => false,
        };

        for action in self.planner.plan_monthly(prior, assigned) {
            match action {
                RollAction::Skip { reason, .. } => {
                    tracing::info!(%today, reason = %reason, "Skipping monthly roll");
                    report.skips.push(reason);
                }
                RollAction::Open(intent) => {
                    machine.transition(RollState::MonthlyDue)?;
                    tracing::info!(
                        earnings_date = ?prior,
                        expiry = %intent.expiry.format("%Y%m%d"),
                        "Assignment found, monthly roll due"
                    );
                    let outcome = self.open(today, &intent, &mut report).await;
                    let next = if report.order_count() > 0 {
                        RollState::MonthlyExecuted
                    } else {
                        RollState::Idle
                    };
                    machine.transition(next)?;
                    outcome?;
                }
                RollAction::Close { position } => {
                    tracing::warn!(contract = %position.contract, "Ignoring close in monthly plan");
                }
            }
        }

        report.final_state = machine.state();
        Ok(report)
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
                tracing::warn!(reason = %reason, "Skipping monthly roll");
                report.skips.push(reason);
            }
        }
        Ok(())
    }
}
