//! Configuration loading errors.

use std::path::PathBuf;

use thiserror::Error;

/// Failure loading the YAML configuration document. Anything discovered
/// after a successful load is a warning (see [`crate::sanitize::validate`]),
/// never an error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}")]
    Read {
        /// Path that could not be read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file was not valid YAML.
    #[error("failed to parse configuration file {path}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: serde_yaml::Error,
    },
}
