//! Use Cases
//!
//! Each use case drives the ports through one step of an invocation.

mod monthly_roll;
mod order_placement;
mod plan_rolls;
mod refresh_archive;
mod run_cycle;
mod weekly_roll;

pub use monthly_roll::MonthlyRollUseCase;
pub use order_placement::RollSettings;
pub use plan_rolls::PlanRollsUseCase;
pub use refresh_archive::{
    ArchiveReport, ArchiveSettings, DEFAULT_LOOKBACK_YEARS, RefreshArchiveUseCase,
};
pub use run_cycle::{CycleReport, CycleStep, CycleSteps, RunCycleUseCase, StepFailure};
pub use weekly_roll::WeeklyRollUseCase;
