//! EOD archive configuration.

use serde::{Deserialize, Serialize};

use crate::domain::option_position::OptionRight;

/// Archive location and scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// CSV file path.
    #[serde(default = "default_path")]
    pub path: String,
    /// Years of history fetched into an empty archive.
    #[serde(default = "default_lookback_years")]
    pub lookback_years: u32,
    /// Rights archived.
    #[serde(default = "default_rights")]
    pub rights: Vec<OptionRight>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            lookback_years: default_lookback_years(),
            rights: default_rights(),
        }
    }
}

fn default_path() -> String {
    "mstr_options_eod.csv".to_string()
}
const fn default_lookback_years() -> u32 {
    2
}
fn default_rights() -> Vec<OptionRight> {
    vec![OptionRight::Put]
}
