//! Domain Layer
//!
//! The innermost layer containing the roll decision logic with zero infrastructure
//! dependencies. This layer defines:
//!
//! - **Value Objects**: Option contracts, quotes, positions, archive rows
//! - **Domain Services**: The pure roll planner
//! - **State Machine**: Per-invocation roll state transitions
//!
//! # Bounded Contexts
//!
//! - [`option_position`]: Option contracts, quotes and held positions
//! - [`rolling`]: Earnings calendar, roll planning, roll state and events
//! - [`archive`]: End-of-day option price table and merge rules

pub mod archive;
pub mod option_position;
pub mod rolling;
pub mod shared;
