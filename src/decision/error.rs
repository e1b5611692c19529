//! Scoring configuration errors.

use thiserror::Error;

/// Errors raised while loading or checking a [`super::DecisionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing or serialization failed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration parsed but is not usable.
    #[error("Invalid scoring config: {0}")]
    Invalid(String),
}
