//! Roll planner.
//!
//! A pure function from `(today, earnings calendar, live positions, assignment
//! fact)` to the list of actions each roll cadence should take. Nothing here
//! talks to the gateway; the use cases gather the inputs and execute the plan.

use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::earnings_calendar::EarningsCalendar;
use super::policy::RollPolicy;
use super::roll_event::{RollKind, SkipReason};
use crate::domain::option_position::{OptionPosition, OptionRight};
use crate::domain::shared::Symbol;

/// Request to sell a new option selected by delta.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenIntent {
    /// Roll cadence.
    pub kind: RollKind,
    /// Expiry to search.
    pub expiry: NaiveDate,
    /// Right to sell.
    pub right: OptionRight,
    /// Minimum absolute delta.
    pub target_delta: f64,
    /// Contracts to sell.
    pub quantity: u64,
}

/// One planned step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RollAction {
    /// Place no order for this cadence.
    Skip {
        /// Roll cadence.
        kind: RollKind,
        /// Why.
        reason: SkipReason,
    },
    /// Buy back the full size of a held short put.
    Close {
        /// Position to flatten.
        position: OptionPosition,
    },
    /// Sell a delta-selected option.
    Open(OpenIntent),
}

impl fmt::Display for RollAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip { kind, reason } => write!(f, "{kind}: skip ({reason})"),
            Self::Close { position } => write!(
                f,
                "Buy to close {} x {}",
                position.close_quantity(),
                position.contract
            ),
            Self::Open(intent) => write!(
                f,
                "{}: sell {} x {} expiring {} at |delta| >= {:.2}",
                intent.kind,
                intent.quantity,
                intent.right,
                intent.expiry.format("%Y%m%d"),
                intent.target_delta
            ),
        }
    }
}

/// Everything the planner needs, as re-derived from the brokerage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollInputs {
    /// Evaluation date.
    pub today: NaiveDate,
    /// Latest earnings date on or before `today`.
    pub prior_earnings: Option<NaiveDate>,
    /// Whether the position tied to `prior_earnings` was assigned.
    pub assigned: bool,
    /// Live option positions on the underlying.
    pub positions: Vec<OptionPosition>,
}

/// Actions for both cadences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollPlan {
    /// Monthly cadence actions.
    pub monthly: Vec<RollAction>,
    /// Weekly cadence actions (closes first, then the open).
    pub weekly: Vec<RollAction>,
}

/// Stateless roll planner.
#[derive(Debug, Clone, Copy)]
pub struct RollPlanner {
    policy: RollPolicy,
}

impl RollPlanner {
    /// Create a planner for `policy`.
    #[must_use]
    pub const fn new(policy: RollPolicy) -> Self {
        Self { policy }
    }

    /// Policy in use.
    #[must_use]
    pub const fn policy(&self) -> &RollPolicy {
        &self.policy
    }

    /// The earnings date the monthly check is anchored on.
    #[must_use]
    pub fn monthly_anchor(
        &self,
        today: NaiveDate,
        calendar: &EarningsCalendar,
    ) -> Option<NaiveDate> {
        calendar.most_recent_on_or_before(today)
    }

    /// Expiry for the monthly open: prior earnings date plus the monthly offset.
    #[must_use]
    pub fn monthly_expiry(&self, prior_earnings: NaiveDate) -> NaiveDate {
        add_days(prior_earnings, self.policy.monthly_offset_days)
    }

    /// Expiry for the weekly open: today plus the weekly offset.
    #[must_use]
    pub fn weekly_expiry(&self, today: NaiveDate) -> NaiveDate {
        add_days(today, self.policy.weekly_offset_days)
    }

    /// Plan the monthly cadence.
    #[must_use]
    pub fn plan_monthly(
        &self,
        prior_earnings: Option<NaiveDate>,
        assigned: bool,
    ) -> Vec<RollAction> {
        let Some(date) = prior_earnings else {
            return vec![RollAction::Skip {
                kind: RollKind::Monthly,
                reason: SkipReason::NoPriorEarnings,
            }];
        };

        if !assigned {
            return vec![RollAction::Skip {
                kind: RollKind::Monthly,
                reason: SkipReason::NotAssigned { date },
            }];
        }

        vec![RollAction::Open(self.intent(
            RollKind::Monthly,
            self.monthly_expiry(date),
        ))]
    }

    /// Plan the weekly cadence: close every short put on `underlying`, then
    /// open the 7-day replacement.
    #[must_use]
    pub fn plan_weekly(
        &self,
        today: NaiveDate,
        underlying: &Symbol,
        positions: &[OptionPosition],
    ) -> Vec<RollAction> {
        let mut actions: Vec<RollAction> = positions
            .iter()
            .filter(|p| p.is_short_put_on(underlying))
            .map(|p| RollAction::Close {
                position: p.clone(),
            })
            .collect();

        actions.push(RollAction::Open(
            self.intent(RollKind::Weekly, self.weekly_expiry(today)),
        ));
        actions
    }

    /// Plan both cadences.
    #[must_use]
    pub fn plan(&self, underlying: &Symbol, inputs: &RollInputs) -> RollPlan {
        RollPlan {
            monthly: self.plan_monthly(inputs.prior_earnings, inputs.assigned),
            weekly: self.plan_weekly(inputs.today, underlying, &inputs.positions),
        }
    }

    fn intent(&self, kind: RollKind, expiry: NaiveDate) -> OpenIntent {
        OpenIntent {
            kind,
            expiry,
            right: self.policy.right,
            target_delta: self.policy.target_delta,
            quantity: u64::from(self.policy.contracts),
        }
    }
}

fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}
