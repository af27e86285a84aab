// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Roll Engine - Rust Core Library
//!
//! Short put roll engine for a single underlying, driven once per invocation
//! against a brokerage gateway.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside → outside)
//!
//! - **Domain**: Pure roll logic
//!   - `option_position`: Option contracts, quotes, held positions
//!   - `rolling`: Earnings calendar, roll planner, roll state machine, roll events
//!   - `archive`: EOD rows and the append/deduplicate/sort merge
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Interfaces for external systems (`MarketDataPort`, `ExecutionPort`,
//!     `GatewaySessionPort`, `ArchiveStorePort`)
//!   - `services`: `QuoteProbe` (scoped quote subscriptions), `StrikeSelector`
//!   - `use_cases`: `RefreshArchive`, `MonthlyRoll`, `WeeklyRoll`, `PlanRolls`, `RunCycle`
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `gateway`: Interactive Brokers Client Portal adapter
//!   - `archive`: CSV archive store
//!
//! # Invocation
//!
//! connect → refresh archive → monthly roll → weekly roll → disconnect.
//! Disconnect runs on every path.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Cross-cutting
// =============================================================================

/// YAML configuration.
pub mod config;

/// Engine-level error type.
pub mod error;

/// Tracing setup.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

// Domain re-exports
pub use domain::archive::{EodRow, EodTable};
pub use domain::option_position::{OptionContract, OptionPosition, OptionQuote, OptionRight};
pub use domain::rolling::{
    EarningsCalendar, RollEvent, RollKind, RollPlan, RollPolicy, RollReport, RollState,
    RollStateMachine,
};
pub use domain::shared::{DomainError, Money, Symbol};

// Application re-exports
pub use application::ports::{
    ArchiveStorePort, ExecutionPort, GatewaySessionPort, MarketDataPort,
};
pub use application::services::{QuoteProbe, StrikeSearch, StrikeSelector};
pub use application::use_cases::{
    ArchiveSettings, CycleReport, CycleSteps, MonthlyRollUseCase, PlanRollsUseCase,
    RefreshArchiveUseCase, RollSettings, RunCycleUseCase, WeeklyRollUseCase,
};

// Infrastructure re-exports
pub use infrastructure::{CsvArchiveStore, IbkrConfig, IbkrError, IbkrGatewayAdapter};

pub use config::{Config, ConfigError, load_config};
pub use error::RollEngineError;
