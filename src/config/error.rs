//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::job::JobError;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as YAML.
    #[error("YAML parse error in '{path}': {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Failed to parse YAML from a string (no file context).
    #[error("YAML parse error: {0}")]
    YamlString(#[from] serde_yaml::Error),

    /// Unknown IANA timezone.
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    /// A job definition failed validation.
    #[error("invalid job '{name}': {source}")]
    InvalidJob {
        name: String,
        #[source]
        source: JobError,
    },

    /// Any other invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
