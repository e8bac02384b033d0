//! Error types for commcal.

use thiserror::Error;

/// Errors that can occur while building a combined feed.
#[derive(Error, Debug)]
pub enum CommCalError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dedup policy error: {0}")]
    Policy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for commcal operations.
pub type CommCalResult<T> = Result<T, CommCalError>;
