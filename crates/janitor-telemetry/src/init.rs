//! Tracing subscriber setup.
//!
//! One entry point, one decision: pretty for a human terminal, JSON for a
//! container log collector. Level comes from `general.debug_logging`, with
//! `RUST_LOG` always winning when set.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, TelemetryError};

/// Default logging level when neither `RUST_LOG` nor `debug_logging` raise it.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Output format for the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON, one object per line.
    Json,
    /// Human-readable, colored when the terminal supports it.
    Pretty,
}

/// Logging configuration derived from `general.*`.
#[derive(Debug, Clone, Copy)]
pub struct LoggingConfig {
    /// Emit debug-level logs in addition to info and above.
    pub debug: bool,
    /// Emit JSON instead of the human-readable format.
    pub structured: bool,
}

impl LoggingConfig {
    fn level(self) -> &'static str {
        if self.debug { "debug" } else { DEFAULT_LOG_LEVEL }
    }

    fn format(self) -> LogFormat {
        if self.structured { LogFormat::Json } else { LogFormat::Pretty }
    }
}

/// Install the global tracing subscriber for the process.
///
/// # Errors
///
/// Returns an error if a subscriber has already been installed globally.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level()));
    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format() {
        LogFormat::Json => registry.with(fmt::layer().json().with_target(false).with_thread_ids(false)).try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(false).with_thread_ids(false)).try_init(),
    };
    result.map_err(|source| TelemetryError::SubscriberInstall { source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_logging_raises_the_level() {
        let quiet = LoggingConfig { debug: false, structured: false };
        let verbose = LoggingConfig { debug: true, structured: false };
        assert_eq!(quiet.level(), "info");
        assert_eq!(verbose.level(), "debug");
    }

    #[test]
    fn structured_flag_selects_json() {
        let config = LoggingConfig { debug: false, structured: true };
        assert_eq!(config.format(), LogFormat::Json);
    }
}
