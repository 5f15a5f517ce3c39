//! # Resource Errors
//!
//! Every failure a resource handler can return, mapped onto HTTP statuses.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::query::QueryError;
use crate::schema::SchemaError;
use crate::store::StoreError;

/// Result type for resource handlers
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Resource errors
#[derive(Debug, Clone, Error)]
pub enum ResourceError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// Parameter or composition error (status decided by the query error)
    #[error("{0}")]
    Query(#[from] QueryError),

    /// Malformed request body
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// No document with this key
    #[error("No document found for '{0}'")]
    NotFound(String),

    /// Write rejected by the submission state machine
    #[error("Conflict: {0}")]
    Conflict(String),

    // ==================
    // Server Errors (5xx)
    // ==================
    /// Store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Stored document does not match the resource schema
    #[error("Response validation failed: {0}")]
    Validation(#[from] SchemaError),

    /// Store call exceeded the resource timeout
    #[error("Query timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResourceError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResourceError::Query(err) => err.status_code(),
            ResourceError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ResourceError::NotFound(_) => StatusCode::NOT_FOUND,
            ResourceError::Conflict(_) => StatusCode::CONFLICT,
            ResourceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ResourceError::Validation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ResourceError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ResourceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<ResourceError> for ErrorResponse {
    fn from(err: ResourceError) -> Self {
        Self {
            code: err.status_code().as_u16(),
            error: err.to_string(),
        }
    }
}

impl IntoResponse for ResourceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");
        }
        let body = Json(ErrorResponse::from(self));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ResourceError::from(QueryError::invalid("_limit", "bad")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ResourceError::NotFound("mp-1".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ResourceError::Conflict("terminal".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ResourceError::Timeout(Duration::from_millis(5)).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ResourceError::from(StoreError::ConnectionFailed("down".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_timeout_message() {
        let err = ResourceError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Query timed out after 250ms");
    }
}
