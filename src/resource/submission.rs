//! Submission resource
//!
//! Clients `POST` payloads; the server derives the submission id from the
//! payload's key fields, so re-posting the same payload is idempotent.
//! Workers advance the state with `PATCH`. Records in a terminal state are
//! never rewritten.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::Instrument;

use super::envelope::Envelope;
use super::errors::{ResourceError, ResourceResult};
use super::headers::HeaderProcessor;
use super::{bounded, find_with_count, request_span, validate_documents, Resource, ResourceSettings};
use crate::document::Document;
use crate::query::operators::submission::{timestamp, STATE};
use crate::query::operators::{submission_id, SubmissionState};
use crate::query::{IndexSpec, OperatorChain, PayloadOperator, QueryOperator, RequestParams};
use crate::schema::DocumentSchema;
use crate::store::Collection;

pub const SUBMISSION_ID: &str = "submission_id";

/// Idempotent submissions with a forward-only state machine
pub struct SubmissionResource {
    collection: Arc<dyn Collection>,
    schema: Arc<DocumentSchema>,
    chain: OperatorChain,
    payload_operators: Vec<Arc<dyn PayloadOperator>>,
    key_fields: Vec<String>,
    default_state: SubmissionState,
    headers: HeaderProcessor,
    settings: ResourceSettings,
    disable_validation: bool,
    // Serialises read-modify-write cycles of this process
    write_lock: Mutex<()>,
}

impl SubmissionResource {
    /// `key_fields` are the payload fields the submission id is derived from
    pub fn new(
        collection: Arc<dyn Collection>,
        schema: Arc<DocumentSchema>,
        key_fields: Vec<String>,
        settings: ResourceSettings,
    ) -> Self {
        Self {
            collection,
            schema,
            chain: OperatorChain::default(),
            payload_operators: Vec::new(),
            key_fields,
            default_state: SubmissionState::Submitted,
            headers: HeaderProcessor::default(),
            settings,
            disable_validation: false,
            write_lock: Mutex::new(()),
        }
    }

    /// Append a GET-side operator
    pub fn with_operator(mut self, operator: Arc<dyn QueryOperator>) -> Self {
        self.chain.push(operator);
        self
    }

    pub fn with_payload_operator(mut self, operator: Arc<dyn PayloadOperator>) -> Self {
        self.payload_operators.push(operator);
        self
    }

    pub fn with_default_state(mut self, state: SubmissionState) -> Self {
        self.default_state = state;
        self
    }

    pub fn with_header_processor(mut self, headers: HeaderProcessor) -> Self {
        self.headers = headers;
        self
    }

    pub fn disable_validation(mut self) -> Self {
        self.disable_validation = true;
        self
    }

    fn stored_state(&self, document: &Document) -> ResourceResult<SubmissionState> {
        match document.get(STATE) {
            None => Ok(self.default_state),
            Some(Value::String(raw)) => raw.parse().map_err(|e| {
                ResourceError::Internal(format!("stored submission has invalid state: {}", e))
            }),
            Some(other) => Err(ResourceError::Internal(format!(
                "stored submission has invalid state: {}",
                other
            ))),
        }
    }

    async fn load(&self, id: &str) -> ResourceResult<Option<Document>> {
        bounded(
            self.settings.timeout,
            self.collection.name(),
            "find_one",
            self.collection.find_one(id, None),
        )
        .await
    }

    async fn store(&self, document: Document) -> ResourceResult<()> {
        bounded(
            self.settings.timeout,
            self.collection.name(),
            "upsert",
            self.collection.upsert(document),
        )
        .await
    }

    fn envelope(&self, document: Document) -> Envelope {
        Envelope::new(vec![document], &self.settings.api_version, Document::new())
    }

    /// Validate and store a new submission. Returns 201 on first write and
    /// 200 with the stored record when it already exists.
    pub async fn submit(&self, body: Value) -> ResourceResult<Envelope> {
        let mut payload = match body {
            Value::Object(payload) => payload,
            _ => return Err(ResourceError::InvalidBody("expected a JSON object".to_string())),
        };
        for operator in &self.payload_operators {
            payload = operator.validate(payload)?;
        }

        let state = match payload.remove(STATE) {
            None => self.default_state,
            Some(Value::String(raw)) => raw
                .parse::<SubmissionState>()
                .map_err(|e| ResourceError::InvalidBody(format!("state: {}", e)))?,
            Some(other) => {
                return Err(ResourceError::InvalidBody(format!(
                    "state must be a string, got {}",
                    other
                )))
            }
        };
        if state.is_terminal() {
            return Err(ResourceError::InvalidBody(format!(
                "a submission cannot start in terminal state '{}'",
                state
            )));
        }

        let id = submission_id(&payload, &self.key_fields)?;

        let _guard = self.write_lock.lock().await;
        if let Some(existing) = self.load(&id).await? {
            let existing_state = self.stored_state(&existing)?;
            if existing_state.is_terminal() {
                return Err(ResourceError::Conflict(format!(
                    "submission {} is already {}",
                    id, existing_state
                )));
            }
            tracing::debug!(submission_id = %id, state = %existing_state, "Duplicate submission");
            return Ok(self.envelope(existing));
        }

        let now = timestamp(Utc::now());
        payload.insert(SUBMISSION_ID.to_string(), json!(id));
        payload.insert(STATE.to_string(), json!(state));
        payload.insert("last_updated".to_string(), json!(now));
        payload.insert(
            "history".to_string(),
            json!([{"state": state, "timestamp": now}]),
        );

        self.store(payload.clone()).await?;
        tracing::info!(submission_id = %id, state = %state, "Submission stored");
        Ok(self.envelope(payload).with_status(StatusCode::CREATED))
    }

    /// Move a submission to a later state
    pub async fn advance(&self, id: &str, body: Value) -> ResourceResult<Envelope> {
        let body = match body {
            Value::Object(body) => body,
            _ => return Err(ResourceError::InvalidBody("expected a JSON object".to_string())),
        };
        if let Some(field) = body.keys().find(|k| k.as_str() != STATE) {
            return Err(ResourceError::InvalidBody(format!(
                "only '{}' can be updated, got '{}'",
                STATE, field
            )));
        }
        let next = match body.get(STATE) {
            Some(Value::String(raw)) => raw
                .parse::<SubmissionState>()
                .map_err(|e| ResourceError::InvalidBody(format!("state: {}", e)))?,
            _ => return Err(ResourceError::InvalidBody("'state' is required".to_string())),
        };

        let _guard = self.write_lock.lock().await;
        let mut document = self
            .load(id)
            .await?
            .ok_or_else(|| ResourceError::NotFound(id.to_string()))?;
        let current = self.stored_state(&document)?;

        if current == next && !current.is_terminal() {
            return Ok(self.envelope(document));
        }
        if !current.can_transition_to(next) {
            return Err(ResourceError::Conflict(format!(
                "submission {} cannot move from {} to {}",
                id, current, next
            )));
        }

        let now = timestamp(Utc::now());
        document.insert(STATE.to_string(), json!(next));
        document.insert("last_updated".to_string(), json!(now));
        let entry = json!({"state": next, "timestamp": now});
        match document.get_mut("history") {
            Some(Value::Array(history)) => history.push(entry),
            _ => {
                document.insert("history".to_string(), json!([entry]));
            }
        }

        self.store(document.clone()).await?;
        tracing::info!(submission_id = %id, from = %current, to = %next, "Submission advanced");
        Ok(self.envelope(document))
    }

    /// Filtered listing
    pub async fn search(&self, params: &RequestParams) -> ResourceResult<Envelope> {
        let query = self.chain.compose(params, None)?;
        let (documents, total) = find_with_count(
            self.collection.as_ref(),
            &query,
            Default::default(),
            self.settings.timeout,
        )
        .await?;

        validate_documents(&self.schema, &documents, !self.disable_validation)?;
        let processed = self.chain.post_process(documents, &query)?;

        let mut meta = self.chain.meta();
        meta.extend(processed.meta);
        meta.insert("total_doc".to_string(), json!(total));
        Ok(Envelope::new(processed.documents, &self.settings.api_version, meta))
    }

    pub async fn get_by_id(&self, id: &str) -> ResourceResult<Envelope> {
        let document = self
            .load(id)
            .await?
            .ok_or_else(|| ResourceError::NotFound(id.to_string()))?;
        validate_documents(
            &self.schema,
            std::slice::from_ref(&document),
            !self.disable_validation,
        )?;
        Ok(self.envelope(document))
    }
}

async fn search_handler(
    State(resource): State<Arc<SubmissionResource>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let caller = resource.headers.identity(&headers);
    let span = request_span(resource.collection.name(), "search");
    let result = resource
        .search(&RequestParams::from(params))
        .instrument(span)
        .await;
    resource.headers.respond(&caller, result)
}

async fn get_handler(
    State(resource): State<Arc<SubmissionResource>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let caller = resource.headers.identity(&headers);
    let span = request_span(resource.collection.name(), "get_by_id");
    let result = resource.get_by_id(&id).instrument(span).await;
    resource.headers.respond(&caller, result)
}

async fn submit_handler(
    State(resource): State<Arc<SubmissionResource>>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Response {
    let caller = resource.headers.identity(&headers);
    let span = request_span(resource.collection.name(), "submit");
    let result = match body {
        Some(Json(body)) => resource.submit(body).instrument(span).await,
        None => Err(ResourceError::InvalidBody("expected a JSON body".to_string())),
    };
    resource.headers.respond(&caller, result)
}

async fn advance_handler(
    State(resource): State<Arc<SubmissionResource>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Response {
    let caller = resource.headers.identity(&headers);
    let span = request_span(resource.collection.name(), "advance");
    let result = match body {
        Some(Json(body)) => resource.advance(&id, body).instrument(span).await,
        None => Err(ResourceError::InvalidBody("expected a JSON body".to_string())),
    };
    resource.headers.respond(&caller, result)
}

impl Resource for SubmissionResource {
    fn collection_name(&self) -> &str {
        self.collection.name()
    }

    fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/", get(search_handler).post(submit_handler))
            .route("/:id", get(get_handler).patch(advance_handler))
            .with_state(self)
    }

    fn ensure_indexes(&self) -> Vec<IndexSpec> {
        let mut indexes = self.chain.ensure_indexes();
        let key = IndexSpec::unique(SUBMISSION_ID);
        indexes.retain(|index| index.field != key.field);
        indexes.insert(0, key);
        indexes
    }
}
