//! Roll strategy configuration.

use serde::{Deserialize, Serialize};

use crate::domain::option_position::OptionRight;
use crate::domain::rolling::RollPolicy;

/// Strategy settings for both roll cadences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Minimum absolute delta of a sold strike.
    #[serde(default = "default_target_delta")]
    pub target_delta: f64,
    /// Contracts per opening order.
    #[serde(default = "default_contracts")]
    pub contracts: u32,
    /// Days after the prior earnings date for the monthly expiry.
    #[serde(default = "default_monthly_offset_days")]
    pub monthly_offset_days: u32,
    /// Days after today for the weekly expiry.
    #[serde(default = "default_weekly_offset_days")]
    pub weekly_offset_days: u32,
    /// Wait between subscribing to a quote and reading it.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// Right of the options sold.
    #[serde(default = "default_right")]
    pub right: OptionRight,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            target_delta: default_target_delta(),
            contracts: default_contracts(),
            monthly_offset_days: default_monthly_offset_days(),
            weekly_offset_days: default_weekly_offset_days(),
            settle_delay_ms: default_settle_delay_ms(),
            right: default_right(),
        }
    }
}

impl StrategyConfig {
    /// The roll policy these settings describe.
    #[must_use]
    pub const fn policy(&self) -> RollPolicy {
        RollPolicy {
            target_delta: self.target_delta,
            contracts: self.contracts,
            monthly_offset_days: self.monthly_offset_days,
            weekly_offset_days: self.weekly_offset_days,
            right: self.right,
        }
    }
}

const fn default_target_delta() -> f64 {
    0.10
}
const fn default_contracts() -> u32 {
    1
}
const fn default_monthly_offset_days() -> u32 {
    30
}
const fn default_weekly_offset_days() -> u32 {
    7
}
const fn default_settle_delay_ms() -> u64 {
    100
}
const fn default_right() -> OptionRight {
    OptionRight::Put
}
