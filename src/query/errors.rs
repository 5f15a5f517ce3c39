//! # Query Errors
//!
//! Errors raised while checking request parameters and composing fragments.

use axum::http::StatusCode;
use thiserror::Error;

use crate::chem::ChemError;

/// Result type for query composition
pub type QueryResult<T> = Result<T, QueryError>;

/// Query composition errors
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Parameter value could not be parsed or is out of range
    #[error("Invalid value for '{param}': {reason}")]
    InvalidParameter { param: String, reason: String },

    /// Parameters no operator of the resource consumes
    #[error("Unknown query parameters: {}", .0.join(", "))]
    UnknownParameters(Vec<String>),

    /// Numeric parameter above its configured maximum
    #[error("Value {value} for '{param}' exceeds the maximum of {max}")]
    LimitExceeded { param: String, value: u64, max: u64 },

    /// More sort fields than the resource allows
    #[error("Requested {requested} sort fields, but at most {max} are allowed")]
    TooManySortFields { requested: usize, max: usize },

    /// Projection of a field the schema does not declare
    #[error("Unknown field '{field}' in '{param}'")]
    UnknownField { param: String, field: String },

    /// Parameters that cannot be combined
    #[error("Ambiguous parameters: {0}")]
    AmbiguousParameters(String),

    /// Formula, chemsys or element input error
    #[error("{0}")]
    Chem(#[from] ChemError),

    /// Request body rejected by a payload operator
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Operators of one resource produced incompatible filters
    #[error("Conflicting query fragments: {0}")]
    ConflictingFilters(String),

    /// An operator failed while post-processing results
    #[error("Post-processing failed: {0}")]
    PostProcess(String),
}

impl QueryError {
    pub fn invalid(param: impl Into<String>, reason: impl Into<String>) -> Self {
        QueryError::InvalidParameter {
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            QueryError::ConflictingFilters(_) | QueryError::PostProcess(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            QueryError::invalid("_limit", "not a number").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            QueryError::ConflictingFilters("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_name_input_and_limit() {
        let err = QueryError::LimitExceeded {
            param: "_limit".into(),
            value: 5000,
            max: 1000,
        };
        let msg = err.to_string();
        assert!(msg.contains("_limit") && msg.contains("1000"));

        let err = QueryError::UnknownParameters(vec!["foo".into(), "bar".into()]);
        assert_eq!(err.to_string(), "Unknown query parameters: foo, bar");
    }
}
