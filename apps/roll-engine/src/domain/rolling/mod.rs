//! Rolling Bounded Context
//!
//! Decides which short put to hold and when to roll it:
//!
//! - **Monthly**: after an assignment on the latest earnings date, sell a
//!   10-delta put expiring 30 days after that date.
//! - **Weekly**: buy back every short put and sell a 10-delta put expiring in
//!   7 days.
//!
//! The planner is pure. The state machine validates the per-invocation path
//! through `IDLE → *_DUE → *_EXECUTED`.

mod earnings_calendar;
mod planner;
mod policy;
mod roll_event;
mod roll_state;

pub use earnings_calendar::EarningsCalendar;
pub use planner::{OpenIntent, RollAction, RollInputs, RollPlan, RollPlanner};
pub use policy::{RollPolicy, validate_target_delta};
pub use roll_event::{RollEvent, RollKind, RollReport, SkipReason};
pub use roll_state::{RollState, RollStateMachine};
