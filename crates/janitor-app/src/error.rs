//! Application-level error type for the bootstrap sequence.

use thiserror::Error;

/// Result alias for bootstrap operations.
pub type AppResult<T> = Result<T, AppError>;

/// Errors that can abort startup before the runner loop begins.
#[derive(Debug, Error)]
pub enum AppError {
    /// Loading the YAML settings document failed.
    #[error("failed to load configuration")]
    Config(#[source] janitor_config::ConfigError),
    /// Installing the tracing subscriber failed.
    #[error("failed to initialize logging")]
    Telemetry(#[source] janitor_telemetry::TelemetryError),
}
