//! Roll state machine.
//!
//! One machine is created per invocation. It starts `IDLE`, moves through the
//! monthly and weekly phases, and is discarded at the end of the run; the
//! brokerage account is the only durable state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::DomainError;

/// Per-invocation roll state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RollState {
    /// Nothing to do (or the last phase was skipped).
    Idle,
    /// An assignment was found; a monthly open is pending.
    MonthlyDue,
    /// The monthly open order was confirmed.
    MonthlyExecuted,
    /// Weekly close/open sequence in progress.
    WeeklyDue,
    /// At least one weekly order was confirmed.
    WeeklyExecuted,
}

impl RollState {
    /// Whether `self -> next` is an allowed transition.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::MonthlyDue | Self::WeeklyDue)
                | (Self::MonthlyDue, Self::MonthlyExecuted | Self::Idle)
                | (Self::MonthlyExecuted, Self::WeeklyDue)
                | (Self::WeeklyDue, Self::WeeklyExecuted | Self::Idle)
        )
    }

    /// Whether this state can end an invocation.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Idle | Self::MonthlyExecuted | Self::WeeklyExecuted
        )
    }
}

impl fmt::Display for RollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::MonthlyDue => "MONTHLY_DUE",
            Self::MonthlyExecuted => "MONTHLY_EXECUTED",
            Self::WeeklyDue => "WEEKLY_DUE",
            Self::WeeklyExecuted => "WEEKLY_EXECUTED",
        };
        write!(f, "{name}")
    }
}

/// Tracks the current state and the path taken during one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollStateMachine {
    state: RollState,
    history: Vec<RollState>,
}

impl Default for RollStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RollStateMachine {
    /// Start a new machine in `IDLE`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RollState::Idle,
            history: vec![RollState::Idle],
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> RollState {
        self.state
    }

    /// Every state visited, starting with `IDLE`.
    #[must_use]
    pub fn history(&self) -> &[RollState] {
        &self.history
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` when the move is not allowed; the
    /// machine keeps its current state.
    pub fn transition(&mut self, next: RollState) -> Result<(), DomainError> {
        if !self.state.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                entity: "RollStateMachine".to_string(),
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::debug!(from = %self.state, to = %next, "Roll state transition");
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Enter the weekly phase from whatever the monthly phase ended in.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` if the monthly phase is still pending.
    pub fn begin_weekly(&mut self) -> Result<(), DomainError> {
        self.transition(RollState::WeeklyDue)
    }
}
