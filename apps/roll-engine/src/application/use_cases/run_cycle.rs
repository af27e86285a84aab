//! Run Cycle Use Case
//!
//! One invocation: connect, refresh the archive, run the monthly then the
//! weekly roll, disconnect. Disconnect happens on every path.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;

use super::monthly_roll::MonthlyRollUseCase;
use super::refresh_archive::{ArchiveReport, RefreshArchiveUseCase};
use super::weekly_roll::WeeklyRollUseCase;
use crate::application::ports::{
    ArchiveStorePort, ExecutionPort, GatewaySessionPort, MarketDataPort,
};
use crate::domain::rolling::{RollReport, RollStateMachine};
use crate::error::RollEngineError;

/// Which steps a cycle runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSteps {
    /// Refresh the EOD archive.
    pub archive: bool,
    /// Run the monthly and weekly rolls.
    pub rolls: bool,
}

impl CycleSteps {
    /// Archive and rolls.
    pub const ALL: Self = Self {
        archive: true,
        rolls: true,
    };
    /// Archive only.
    pub const ARCHIVE_ONLY: Self = Self {
        archive: true,
        rolls: false,
    };
    /// Rolls only.
    pub const ROLLS_ONLY: Self = Self {
        archive: false,
        rolls: true,
    };
}

/// A cycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStep {
    /// EOD archive refresh.
    Archive,
    /// Monthly roll.
    Monthly,
    /// Weekly roll.
    Weekly,
}

impl fmt::Display for CycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archive => write!(f, "archive"),
            Self::Monthly => write!(f, "monthly"),
            Self::Weekly => write!(f, "weekly"),
        }
    }
}

/// A step that failed without stopping the cycle.
#[derive(Debug)]
pub struct StepFailure {
    /// Failed step.
    pub step: CycleStep,
    /// The error.
    pub error: RollEngineError,
}

/// Outcome of one cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Archive refresh outcome, if it ran and succeeded.
    pub archive: Option<ArchiveReport>,
    /// Monthly roll outcome, if it ran and succeeded.
    pub monthly: Option<RollReport>,
    /// Weekly roll outcome, if it ran and succeeded.
    pub weekly: Option<RollReport>,
    /// Non-fatal step failures, in order.
    pub failures: Vec<StepFailure>,
}

impl CycleReport {
    /// Whether a roll confirmed closes but could not open the replacement.
    #[must_use]
    pub fn has_partial_failure(&self) -> bool {
        self.failures.iter().any(|f| f.error.is_partial())
    }

    /// Whether every step that ran succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Use case for a full run.
pub struct RunCycleUseCase<S, M, E, A>
where
    S: GatewaySessionPort + ?Sized,
    M: MarketDataPort + ?Sized,
    E: ExecutionPort + ?Sized,
    A: ArchiveStorePort + ?Sized,
{
    session: Arc<S>,
    archive: RefreshArchiveUseCase<M, A>,
    monthly: MonthlyRollUseCase<M, E>,
    weekly: WeeklyRollUseCase<M, E>,
}

impl<S, M, E, A> RunCycleUseCase<S, M, E, A>
where
    S: GatewaySessionPort + ?Sized,
    M: MarketDataPort + ?Sized,
    E: ExecutionPort + ?Sized,
    A: ArchiveStorePort + ?Sized,
{
    /// Create a new `RunCycleUseCase`.
    pub const fn new(
        session: Arc<S>,
        archive: RefreshArchiveUseCase<M, A>,
        monthly: MonthlyRollUseCase<M, E>,
        weekly: WeeklyRollUseCase<M, E>,
    ) -> Self {
        Self {
            session,
            archive,
            monthly,
            weekly,
        }
    }

    /// Run `steps` for `today`.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error (connection loss or cancellation) after
    /// disconnecting. Other step errors are collected in the report.
    pub async fn execute(
        &self,
        today: NaiveDate,
        steps: CycleSteps,
    ) -> Result<CycleReport, RollEngineError> {
        let result = match self.session.connect().await {
            Ok(info) => {
                tracing::info!(
                    account_id = %info.account_id,
                    client_id = info.client_id,
                    %today,
                    "Connected to gateway"
                );
                self.run_steps(today, steps).await
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to gateway");
                Err(e.into())
            }
        };

        match self.session.disconnect().await {
            Ok(()) => tracing::info!("Disconnected from gateway"),
            Err(e) => tracing::warn!(error = %e, "Disconnect failed"),
        }

        result
    }

    async fn run_steps(
        &self,
        today: NaiveDate,
        steps: CycleSteps,
    ) -> Result<CycleReport, RollEngineError> {
        let mut report = CycleReport::default();

        if steps.archive {
            match self.archive.execute(today).await {
                Ok(archive) => report.archive = Some(archive),
                Err(e) => record(&mut report, CycleStep::Archive, e)?,
            }
        }

        if steps.rolls {
            let mut machine = RollStateMachine::new();

            match self.monthly.execute(today, &mut machine).await {
                Ok(monthly) => report.monthly = Some(monthly),
                Err(e) => record(&mut report, CycleStep::Monthly, e)?,
            }

            match self.weekly.execute(today, &mut machine).await {
                Ok(weekly) => report.weekly = Some(weekly),
                Err(e) => record(&mut report, CycleStep::Weekly, e)?,
            }

            tracing::info!(
                final_state = %machine.state(),
                path = ?machine.history(),
                "Roll cycle finished"
            );
        }

        Ok(report)
    }
}

fn record(
    report: &mut CycleReport,
    step: CycleStep,
    error: RollEngineError,
) -> Result<(), RollEngineError> {
    if error.is_fatal() {
        tracing::error!(%step, error = %error, "Step failed, aborting cycle");
        return Err(error);
    }
    if error.is_partial() {
        tracing::error!(%step, error = %error, "Partial roll failure");
    } else {
        tracing::warn!(%step, error = %error, "Step failed");
    }
    report.failures.push(StepFailure { step, error });
    Ok(())
}
