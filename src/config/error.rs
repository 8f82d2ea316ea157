//! Configuration error types.

use thiserror::Error;

use crate::domain::PairError;

/// Configuration loading or validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("pairs: {0}")]
    Pair(#[from] PairError),
    #[error("triangular route {name}: {reason}")]
    Route { name: String, reason: String },
    #[error("validation failed: {0}")]
    Validation(String),
}
