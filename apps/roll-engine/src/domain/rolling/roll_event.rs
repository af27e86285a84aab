//! Roll events and reports.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::roll_state::RollState;
use crate::domain::option_position::{OptionContract, OptionRight};
use crate::domain::shared::{BrokerOrderId, Money, OrderSide};

/// Roll cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RollKind {
    /// Post-earnings roll after an assignment.
    Monthly,
    /// Weekly close-and-reopen into a 7-day put.
    Weekly,
}

impl fmt::Display for RollKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monthly => write!(f, "Monthly Roll"),
            Self::Weekly => write!(f, "Weekly Roll"),
        }
    }
}

/// Why a roll (or one leg of it) placed no order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// No earnings date on or before today.
    NoPriorEarnings,
    /// The position tied to the earnings date was not assigned.
    NotAssigned {
        /// Earnings date that was checked.
        date: NaiveDate,
    },
    /// No listed strike reached the delta target.
    NoStrikeMeetsDelta {
        /// Expiry searched.
        expiry: NaiveDate,
        /// Right searched.
        right: OptionRight,
        /// Delta target.
        target_delta: f64,
        /// Strikes probed before giving up.
        probes: usize,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPriorEarnings => write!(f, "no earnings date on or before today"),
            Self::NotAssigned { date } => write!(f, "no assignment on {date}"),
            Self::NoStrikeMeetsDelta {
                expiry,
                right,
                target_delta,
                probes,
            } => write!(
                f,
                "no {right} strike for {} reached delta {target_delta} ({probes} probed)",
                expiry.format("%Y%m%d")
            ),
        }
    }
}

/// One confirmed order placed by a roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollEvent {
    /// Roll cadence that produced the order.
    pub kind: RollKind,
    /// Date the roll was evaluated for.
    pub trigger_date: NaiveDate,
    /// Contract bought back, for closing orders.
    pub closed: Option<OptionContract>,
    /// Contract sold, for opening orders.
    pub opened: Option<OptionContract>,
    /// Order side.
    pub side: OrderSide,
    /// Contracts.
    pub quantity: u64,
    /// Limit price (bid/ask midpoint at decision time).
    pub limit_price: Money,
    /// Gateway order id.
    pub order_id: BrokerOrderId,
}

impl RollEvent {
    /// Event for a buy-to-close.
    #[must_use]
    pub const fn closed(
        kind: RollKind,
        trigger_date: NaiveDate,
        contract: OptionContract,
        quantity: u64,
        limit_price: Money,
        order_id: BrokerOrderId,
    ) -> Self {
        Self {
            kind,
            trigger_date,
            closed: Some(contract),
            opened: None,
            side: OrderSide::Buy,
            quantity,
            limit_price,
            order_id,
        }
    }

    /// Event for a sell-to-open.
    #[must_use]
    pub const fn opened(
        kind: RollKind,
        trigger_date: NaiveDate,
        contract: OptionContract,
        quantity: u64,
        limit_price: Money,
        order_id: BrokerOrderId,
    ) -> Self {
        Self {
            kind,
            trigger_date,
            closed: None,
            opened: Some(contract),
            side: OrderSide::Sell,
            quantity,
            limit_price,
            order_id,
        }
    }

    /// The contract this order traded.
    #[must_use]
    pub fn contract(&self) -> Option<&OptionContract> {
        self.opened.as_ref().or(self.closed.as_ref())
    }
}

impl fmt::Display for RollEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.side {
            OrderSide::Buy => "Bought back",
            OrderSide::Sell => "Sold",
        };
        match self.contract() {
            Some(contract) => write!(
                f,
                "[{}] {verb} {} {} @ {}",
                self.kind,
                self.quantity,
                contract.display_symbol(),
                self.limit_price
            ),
            None => write!(f, "[{}] {verb} {} @ {}", self.kind, self.quantity, self.limit_price),
        }
    }
}

/// Outcome of one roll cadence within an invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollReport {
    /// Roll cadence.
    pub kind: RollKind,
    /// State the machine ended this phase in.
    pub final_state: RollState,
    /// Confirmed orders, in the order they were placed.
    pub events: Vec<RollEvent>,
    /// Skipped legs.
    pub skips: Vec<SkipReason>,
}

impl RollReport {
    /// Empty report for `kind`.
    #[must_use]
    pub const fn new(kind: RollKind) -> Self {
        Self {
            kind,
            final_state: RollState::Idle,
            events: Vec::new(),
            skips: Vec::new(),
        }
    }

    /// Number of confirmed orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.events.len()
    }

    /// Confirmed closing orders.
    pub fn closes(&self) -> impl Iterator<Item = &RollEvent> {
        self.events.iter().filter(|e| e.side == OrderSide::Buy)
    }

    /// Confirmed opening orders.
    pub fn opens(&self) -> impl Iterator<Item = &RollEvent> {
        self.events.iter().filter(|e| e.side == OrderSide::Sell)
    }

    /// Whether any leg was skipped.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        !self.skips.is_empty()
    }
}
