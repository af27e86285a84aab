//! Tracing Setup
//!
//! Console logging through `tracing-subscriber`, configured from the
//! `observability.logging` section.
//!
//! # Configuration
//!
//! - `RUST_LOG`: overrides the filter entirely when set
//! - `observability.logging.level`: default level for `roll_engine`
//! - `observability.logging.format`: `json`, `pretty` or `compact`
//!
//! # Usage
//!
//! ```rust,ignore
//! use roll_engine::telemetry::init_tracing;
//!
//! init_tracing(&config.observability.logging);
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::{LogFormat, LoggingConfig};

/// Build the filter: `RUST_LOG` when set, otherwise `roll_engine=<level>`.
#[must_use]
pub fn env_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(format!("warn,roll_engine={}", logging.level))
            .unwrap_or_else(|_| EnvFilter::new("warn,roll_engine=info"))
    })
}

/// Install the global subscriber.
///
/// Calling this twice is harmless; the second call keeps the first
/// subscriber.
pub fn init_tracing(logging: &LoggingConfig) {
    let span_events = if logging.include_spans {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(logging))
        .with_span_events(span_events)
        .with_target(true);

    let result = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    if let Err(e) = result {
        eprintln!("Tracing already initialized: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_filter_falls_back_on_bad_level() {
        let logging = LoggingConfig {
            level: "not a level!!".to_string(),
            ..LoggingConfig::default()
        };
        let filter = env_filter(&logging);
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn init_twice_does_not_panic() {
        let logging = LoggingConfig::default();
        init_tracing(&logging);
        init_tracing(&logging);
    }
}
