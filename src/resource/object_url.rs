//! Object URL resource
//!
//! `GET /object/*key` checks that the object is referenced by the
//! collection and returns a presigned URL valid for the configured TTL.
//! Grants are issued per request and never stored.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tracing::Instrument;

use super::envelope::Envelope;
use super::errors::{ResourceError, ResourceResult};
use super::headers::HeaderProcessor;
use super::signing::ObjectSigner;
use super::{bounded, request_span, Resource, ResourceSettings};
use crate::document::Document;
use crate::query::IndexSpec;
use crate::store::Collection;

pub struct ObjectUrlResource {
    collection: Arc<dyn Collection>,
    signer: ObjectSigner,
    headers: HeaderProcessor,
    settings: ResourceSettings,
}

impl ObjectUrlResource {
    pub fn new(collection: Arc<dyn Collection>, signer: ObjectSigner, settings: ResourceSettings) -> Self {
        Self {
            collection,
            signer,
            headers: HeaderProcessor::default(),
            settings,
        }
    }

    pub fn with_header_processor(mut self, headers: HeaderProcessor) -> Self {
        self.headers = headers;
        self
    }

    pub async fn issue(&self, key: &str) -> ResourceResult<Envelope> {
        let key = key.trim_start_matches('/');
        if key.is_empty() {
            return Err(ResourceError::InvalidBody("object key is empty".to_string()));
        }

        let projection = [self.collection.key().to_string()];
        let found = bounded(
            self.settings.timeout,
            self.collection.name(),
            "find_one",
            self.collection.find_one(key, Some(&projection[..])),
        )
        .await?;
        if found.is_none() {
            return Err(ResourceError::NotFound(key.to_string()));
        }

        let grant = self.signer.grant(key);
        tracing::debug!(object_key = key, expires_at = %grant.expires_at, "Issued object URL");
        let document = match serde_json::to_value(&grant) {
            Ok(serde_json::Value::Object(document)) => document,
            Ok(_) => Document::new(),
            Err(e) => return Err(ResourceError::Internal(e.to_string())),
        };
        Ok(Envelope::new(vec![document], &self.settings.api_version, Document::new()))
    }
}

async fn issue_handler(
    State(resource): State<Arc<ObjectUrlResource>>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Response {
    let caller = resource.headers.identity(&headers);
    let span = request_span(resource.collection.name(), "object_url");
    let result = resource.issue(&key).instrument(span).await;
    resource.headers.respond(&caller, result)
}

impl Resource for ObjectUrlResource {
    fn collection_name(&self) -> &str {
        self.collection.name()
    }

    fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/object/*key", get(issue_handler))
            .with_state(self)
    }

    fn ensure_indexes(&self) -> Vec<IndexSpec> {
        vec![IndexSpec::unique(self.collection.key())]
    }
}
