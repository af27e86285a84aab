//! Sample configuration loads and validates.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;

use roll_engine::config::LogFormat;
use roll_engine::{OptionRight, load_config};

#[test]
fn sample_config_loads_with_defaults() {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("config.yaml");

    let config = load_config(Some(path.to_str().unwrap()))
        .unwrap_or_else(|e| panic!("Failed to load {}: {e}", path.display()));

    assert_eq!(config.symbol.as_str(), "MSTR");
    assert_eq!(config.earnings_dates.dates().len(), 2);
    assert_eq!(config.strategy.target_delta, 0.10);
    assert_eq!(config.strategy.right, OptionRight::Put);
    assert_eq!(config.archive.rights, vec![OptionRight::Put]);
    assert_eq!(config.gateway.exchange, "SMART");
    assert_eq!(config.gateway.retry.max_attempts, 3);
    assert_eq!(config.observability.logging.format, LogFormat::Compact);
}
