//! Plan Rolls Use Case
//!
//! Read-only: gathers the live inputs and returns what both rolls would do,
//! without probing quotes or placing orders.

use std::sync::Arc;

use chrono::NaiveDate;

use super::order_placement::RollSettings;
use crate::application::ports::ExecutionPort;
use crate::domain::rolling::{RollInputs, RollPlan, RollPlanner};
use crate::error::RollEngineError;

/// Use case for previewing the roll plan.
pub struct PlanRollsUseCase<E: ExecutionPort + ?Sized> {
    execution: Arc<E>,
    planner: RollPlanner,
    settings: RollSettings,
}

impl<E: ExecutionPort + ?Sized> PlanRollsUseCase<E> {
    /// Create a new `PlanRollsUseCase`.
    pub const fn new(execution: Arc<E>, settings: RollSettings) -> Self {
        Self {
            execution,
            planner: RollPlanner::new(settings.policy),
            settings,
        }
    }

    /// Re-derive the planner inputs from the account.
    pub async fn gather(&self, today: NaiveDate) -> Result<RollInputs, RollEngineError> {
        let prior_earnings = self.planner.monthly_anchor(today, &self.settings.calendar);
        let assigned = match prior_earnings {
            Some(date) => {
                self.execution
                    .assignment_history(&self.settings.underlying, date)
                    .await?
            }
            None => false,
        };
        let positions = self.execution.positions(&self.settings.underlying).await?;

        Ok(RollInputs {
            today,
            prior_earnings,
            assigned,
            positions,
        })
    }

    /// Plan both cadences for `today`.
    pub async fn execute(&self, today: NaiveDate) -> Result<RollPlan, RollEngineError> {
        let inputs = self.gather(today).await?;
        let plan = self.planner.plan(&self.settings.underlying, &inputs);
        tracing::info!(
            %today,
            prior_earnings = ?inputs.prior_earnings,
            assigned = inputs.assigned,
            monthly_actions = plan.monthly.len(),
            weekly_actions = plan.weekly.len(),
            "Roll plan ready"
        );
        Ok(plan)
    }
}
