//! Read-only resource

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde_json::json;
use tracing::Instrument;

use super::envelope::Envelope;
use super::errors::{ResourceError, ResourceResult};
use super::headers::{CallerIdentity, HeaderProcessor};
use super::{bounded, find_with_count, request_span, validate_documents, Resource, ResourceSettings};
use crate::document::Document;
use crate::query::{HintScheme, IndexSpec, OperatorChain, QueryOperator, RequestParams};
use crate::schema::DocumentSchema;
use crate::store::Collection;

/// Search (`GET /`) and lookup by key (`GET /:key`) over one collection
pub struct ReadOnlyResource {
    collection: Arc<dyn Collection>,
    schema: Arc<DocumentSchema>,
    chain: OperatorChain,
    hint_scheme: Option<Arc<dyn HintScheme>>,
    headers: HeaderProcessor,
    settings: ResourceSettings,
    enable_default_search: bool,
    enable_get_by_key: bool,
    disable_validation: bool,
}

impl ReadOnlyResource {
    pub fn new(
        collection: Arc<dyn Collection>,
        schema: Arc<DocumentSchema>,
        settings: ResourceSettings,
    ) -> Self {
        Self {
            collection,
            schema,
            chain: OperatorChain::default(),
            hint_scheme: None,
            headers: HeaderProcessor::default(),
            settings,
            enable_default_search: true,
            enable_get_by_key: true,
            disable_validation: false,
        }
    }

    /// Append an operator; later operators win on criteria collisions
    pub fn with_operator(mut self, operator: Arc<dyn QueryOperator>) -> Self {
        self.chain.push(operator);
        self
    }

    pub fn with_hint_scheme(mut self, scheme: Arc<dyn HintScheme>) -> Self {
        self.hint_scheme = Some(scheme);
        self
    }

    pub fn with_header_processor(mut self, headers: HeaderProcessor) -> Self {
        self.headers = headers;
        self
    }

    pub fn enable_default_search(mut self, enabled: bool) -> Self {
        self.enable_default_search = enabled;
        self
    }

    pub fn enable_get_by_key(mut self, enabled: bool) -> Self {
        self.enable_get_by_key = enabled;
        self
    }

    /// Return stored documents without checking them against the schema
    pub fn disable_validation(mut self) -> Self {
        self.disable_validation = true;
        self
    }

    /// Compose, execute and post-process a search
    pub async fn search(
        &self,
        params: &RequestParams,
        caller: &CallerIdentity,
    ) -> ResourceResult<Envelope> {
        let query = self
            .chain
            .compose(params, self.headers.injected_criteria(caller))?;
        if query.is_pipeline() {
            return Err(ResourceError::Internal(
                "read-only resources cannot run pipelines".to_string(),
            ));
        }

        let hints = self
            .hint_scheme
            .as_ref()
            .map(|scheme| scheme.generate_hints(&query))
            .unwrap_or_default();

        let (documents, total) = find_with_count(
            self.collection.as_ref(),
            &query,
            hints,
            self.settings.timeout,
        )
        .await?;

        validate_documents(&self.schema, &documents, !self.disable_validation)?;
        let processed = self.chain.post_process(documents, &query)?;

        let mut meta = self.chain.meta();
        meta.extend(processed.meta);
        meta.insert("total_doc".to_string(), json!(total));
        tracing::debug!(returned = processed.documents.len(), total, "Search complete");

        Ok(Envelope::new(
            processed.documents,
            &self.settings.api_version,
            meta,
        ))
    }

    /// Fetch one document by key. Only projection operators apply.
    pub async fn get_by_key(
        &self,
        key: &str,
        params: &RequestParams,
        caller: &CallerIdentity,
    ) -> ResourceResult<Envelope> {
        let chain = self.chain.key_lookup();
        let mut query = chain.compose(params, None)?;

        let mut criteria = Document::new();
        criteria.insert(self.collection.key().to_string(), json!(key));
        query.criteria = criteria;
        if let Some(license) = self.headers.injected_criteria(caller) {
            query.merge_overriding(license)?;
        }
        query.skip = None;
        query.limit = Some(1);

        let options = query.find_options(None);
        let mut documents = bounded(
            self.settings.timeout,
            self.collection.name(),
            "find",
            self.collection.find(&query.criteria, &options),
        )
        .await?;

        if documents.is_empty() {
            return Err(ResourceError::NotFound(key.to_string()));
        }
        documents.truncate(1);
        validate_documents(&self.schema, &documents, !self.disable_validation)?;
        let processed = chain.post_process(documents, &query)?;

        Ok(Envelope::new(
            processed.documents,
            &self.settings.api_version,
            processed.meta,
        ))
    }
}

async fn search_handler(
    State(resource): State<Arc<ReadOnlyResource>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let caller = resource.headers.identity(&headers);
    let span = request_span(resource.collection.name(), "search");
    let result = resource
        .search(&RequestParams::from(params), &caller)
        .instrument(span)
        .await;
    resource.headers.respond(&caller, result)
}

async fn get_by_key_handler(
    State(resource): State<Arc<ReadOnlyResource>>,
    Path(key): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let caller = resource.headers.identity(&headers);
    let span = request_span(resource.collection.name(), "get_by_key");
    let result = resource
        .get_by_key(&key, &RequestParams::from(params), &caller)
        .instrument(span)
        .await;
    resource.headers.respond(&caller, result)
}

impl Resource for ReadOnlyResource {
    fn collection_name(&self) -> &str {
        self.collection.name()
    }

    fn router(self: Arc<Self>) -> Router {
        let mut router = Router::new();
        if self.enable_default_search {
            router = router.route("/", get(search_handler));
        }
        if self.enable_get_by_key {
            router = router.route("/:key", get(get_by_key_handler));
        }
        router.with_state(self)
    }

    fn ensure_indexes(&self) -> Vec<IndexSpec> {
        let mut indexes = self.chain.ensure_indexes();
        let key = IndexSpec::unique(self.collection.key());
        indexes.retain(|index| index.field != key.field);
        indexes.insert(0, key);
        indexes
    }
}
