//! Roll Engine Binary
//!
//! One invocation against the Client Portal gateway: refresh the EOD archive,
//! run the monthly and weekly rolls, disconnect.
//!
//! # Usage
//!
//! ```bash
//! roll-engine                      # full cycle (same as `run`)
//! roll-engine archive              # archive refresh only
//! roll-engine roll                 # monthly + weekly rolls only
//! roll-engine plan                 # print the roll plan, place nothing
//! roll-engine --today 2025-02-20 run
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log filter (default: `roll_engine=<observability.logging.level>`)
//! - Any `${VAR}` referenced from the config file
//!
//! # Exit Codes
//!
//! - `0`: every step succeeded
//! - `1`: the run aborted or a step failed
//! - `2`: a roll confirmed closes but could not open the replacement

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use roll_engine::application::ports::GatewaySessionPort;
use roll_engine::application::use_cases::{
    ArchiveSettings, CycleReport, CycleSteps, MonthlyRollUseCase, PlanRollsUseCase,
    RefreshArchiveUseCase, RollSettings, RunCycleUseCase, WeeklyRollUseCase,
};
use roll_engine::config::{Config, load_config};
use roll_engine::infrastructure::{CsvArchiveStore, IbkrConfig, IbkrGatewayAdapter};
use roll_engine::telemetry::init_tracing;

/// Exit code for a roll left flat after confirmed closes.
const EXIT_PARTIAL_ROLL: u8 = 2;

/// Concrete type alias for the run cycle use case.
type ConcreteRunCycleUseCase =
    RunCycleUseCase<IbkrGatewayAdapter, IbkrGatewayAdapter, IbkrGatewayAdapter, CsvArchiveStore>;

#[derive(Debug, Parser)]
#[command(name = "roll-engine", version, about = "Delta-targeted short put roll engine")]
struct Cli {
    /// Path to the YAML config file.
    #[arg(long, short, global = true, default_value = "config.yaml")]
    config: String,

    /// Evaluate as of this date (YYYY-MM-DD) instead of today.
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Refresh the archive, then run the monthly and weekly rolls.
    Run,
    /// Refresh the EOD archive only.
    Archive,
    /// Run the monthly and weekly rolls only.
    Roll,
    /// Print what the rolls would do without probing quotes or placing orders.
    Plan,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    load_dotenv();
    let config = load_config(Some(cli.config.as_str()))
        .with_context(|| format!("loading configuration from {}", cli.config))?;
    init_tracing(&config.observability.logging);

    let today = cli
        .today
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let command = cli.command.unwrap_or(Command::Run);

    tracing::info!(
        symbol = %config.symbol,
        %today,
        command = ?command,
        gateway = %format!("{}:{}", config.gateway.host, config.gateway.port),
        "Starting roll engine"
    );

    let shutdown = CancellationToken::new();
    spawn_shutdown_listener(shutdown.clone());

    let gateway = Arc::new(
        IbkrGatewayAdapter::new(IbkrConfig::from(&config.gateway), config.symbol.clone())
            .context("creating gateway client")?,
    );

    let code = match command {
        Command::Plan => run_plan(&config, gateway, today).await,
        Command::Run => run_cycle(&config, gateway, shutdown, today, CycleSteps::ALL).await,
        Command::Archive => {
            run_cycle(&config, gateway, shutdown, today, CycleSteps::ARCHIVE_ONLY).await
        }
        Command::Roll => run_cycle(&config, gateway, shutdown, today, CycleSteps::ROLLS_ONLY).await,
    };

    tracing::info!("Roll engine stopped");
    Ok(code)
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Cancel `shutdown` on Ctrl-C so in-flight quote waits stop promptly.
fn spawn_shutdown_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received, cancelling");
                shutdown.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "Failed to install interrupt handler"),
        }
    });
}

fn roll_settings(config: &Config) -> RollSettings {
    RollSettings {
        underlying: config.symbol.clone(),
        policy: config.strategy.policy(),
        calendar: config.earnings_dates.clone(),
        client_id: config.gateway.client_id,
        settle_delay: Duration::from_millis(config.strategy.settle_delay_ms),
    }
}

fn archive_settings(config: &Config) -> ArchiveSettings {
    ArchiveSettings {
        underlying: config.symbol.clone(),
        rights: config.archive.rights.clone(),
        lookback_years: config.archive.lookback_years,
    }
}

fn create_run_cycle(
    config: &Config,
    gateway: &Arc<IbkrGatewayAdapter>,
    shutdown: CancellationToken,
) -> ConcreteRunCycleUseCase {
    let store = Arc::new(CsvArchiveStore::new(&config.archive.path));
    let settings = roll_settings(config);

    RunCycleUseCase::new(
        Arc::clone(gateway),
        RefreshArchiveUseCase::new(Arc::clone(gateway), store, archive_settings(config)),
        MonthlyRollUseCase::new(
            Arc::clone(gateway),
            Arc::clone(gateway),
            settings.clone(),
            shutdown.clone(),
        ),
        WeeklyRollUseCase::new(Arc::clone(gateway), Arc::clone(gateway), settings, shutdown),
    )
}

async fn run_cycle(
    config: &Config,
    gateway: Arc<IbkrGatewayAdapter>,
    shutdown: CancellationToken,
    today: NaiveDate,
    steps: CycleSteps,
) -> ExitCode {
    let use_case = create_run_cycle(config, &gateway, shutdown);

    match use_case.execute(today, steps).await {
        Ok(report) => summarize(&report),
        Err(e) => {
            tracing::error!(error = %e, "Run aborted");
            ExitCode::FAILURE
        }
    }
}

fn summarize(report: &CycleReport) -> ExitCode {
    if let Some(archive) = &report.archive {
        tracing::info!(
            contracts = archive.contracts,
            skipped = archive.skipped,
            added = archive.added,
            "{}",
            archive.message()
        );
    }
    for roll in report.monthly.iter().chain(report.weekly.iter()) {
        tracing::info!(
            kind = %roll.kind,
            final_state = %roll.final_state,
            orders = roll.events.len(),
            skips = roll.skips.len(),
            "Roll finished"
        );
    }
    for failure in &report.failures {
        tracing::warn!(step = %failure.step, error = %failure.error, "Step failed");
    }

    if report.has_partial_failure() {
        ExitCode::from(EXIT_PARTIAL_ROLL)
    } else if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run_plan(config: &Config, gateway: Arc<IbkrGatewayAdapter>, today: NaiveDate) -> ExitCode {
    if let Err(e) = gateway.connect().await {
        tracing::error!(error = %e, "Failed to connect to gateway");
        if let Err(e) = gateway.disconnect().await {
            tracing::warn!(error = %e, "Disconnect failed");
        }
        return ExitCode::FAILURE;
    }

    let result = PlanRollsUseCase::new(Arc::clone(&gateway), roll_settings(config))
        .execute(today)
        .await;

    if let Err(e) = gateway.disconnect().await {
        tracing::warn!(error = %e, "Disconnect failed");
    }

    match result {
        Ok(plan) => {
            println!("Roll plan for {} as of {today}", config.symbol);
            println!("Monthly:");
            for action in &plan.monthly {
                println!("  {action}");
            }
            println!("Weekly:");
            for action in &plan.weekly {
                println!("  {action}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Planning failed");
            ExitCode::FAILURE
        }
    }
}
