//! Response envelope `{data, meta}`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use crate::document::Document;

/// Body of every successful resource response
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub data: Vec<Document>,
    pub meta: Document,
    #[serde(skip)]
    pub status: StatusCode,
}

impl Envelope {
    /// `meta` always carries `api_version` and `time_stamp`; `extra` is
    /// merged on top
    pub fn new(data: Vec<Document>, api_version: &str, extra: Document) -> Self {
        let mut meta = Document::new();
        meta.insert("api_version".to_string(), json!(api_version));
        meta.insert("time_stamp".to_string(), json!(Utc::now().to_rfc3339()));
        meta.extend(extra);
        Self {
            data,
            meta,
            status: StatusCode::OK,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_fields() {
        let mut extra = Document::new();
        extra.insert("total_doc".to_string(), json!(3));
        let envelope = Envelope::new(Vec::new(), "1.2.0", extra);

        let body = serde_json::to_value(&envelope).unwrap();
        assert_eq!(body["meta"]["api_version"], json!("1.2.0"));
        assert_eq!(body["meta"]["total_doc"], json!(3));
        assert!(body["meta"]["time_stamp"].is_string());
        assert!(body.get("status").is_none());
    }
}
