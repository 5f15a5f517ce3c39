//! # Store Errors

use thiserror::Error;

/// Result type for collection operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a collection
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Criteria uses an operator the store does not support
    #[error("Unsupported query operator: {0}")]
    UnsupportedOperator(String),

    /// Pipeline uses a stage the store does not support
    #[error("Unsupported pipeline stage: {0}")]
    UnsupportedStage(String),

    /// Structurally invalid criteria or pipeline
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Backend unreachable
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Seed or persistence I/O failure
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Io(format!("JSON error: {}", err))
    }
}
