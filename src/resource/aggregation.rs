//! Aggregation resource
//!
//! Exposes one pipeline-producing operator. The operator's post-process
//! hook reports `total_doc`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tracing::Instrument;

use super::envelope::Envelope;
use super::errors::ResourceResult;
use super::headers::HeaderProcessor;
use super::{bounded, request_span, Resource, ResourceSettings};
use crate::query::{IndexSpec, OperatorChain, QueryError, QueryOperator, RequestParams};
use crate::store::Collection;

/// `GET /` running a pipeline built from request parameters
pub struct AggregationResource {
    collection: Arc<dyn Collection>,
    chain: OperatorChain,
    headers: HeaderProcessor,
    settings: ResourceSettings,
}

impl AggregationResource {
    pub fn new(
        collection: Arc<dyn Collection>,
        pipeline_operator: Arc<dyn QueryOperator>,
        settings: ResourceSettings,
    ) -> Self {
        Self {
            collection,
            chain: OperatorChain::new(vec![pipeline_operator]),
            headers: HeaderProcessor::default(),
            settings,
        }
    }

    pub fn with_header_processor(mut self, headers: HeaderProcessor) -> Self {
        self.headers = headers;
        self
    }

    pub async fn search(&self, params: &RequestParams) -> ResourceResult<Envelope> {
        let query = self.chain.compose(params, None)?;
        let pipeline = query.pipeline.as_deref().ok_or_else(|| {
            QueryError::ConflictingFilters(
                "aggregation resources need a pipeline-producing operator".to_string(),
            )
        })?;

        let documents = bounded(
            self.settings.timeout,
            self.collection.name(),
            "aggregate",
            self.collection.aggregate(pipeline),
        )
        .await?;

        let processed = self.chain.post_process(documents, &query)?;
        let mut meta = self.chain.meta();
        meta.extend(processed.meta);
        Ok(Envelope::new(processed.documents, &self.settings.api_version, meta))
    }
}

async fn search_handler(
    State(resource): State<Arc<AggregationResource>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let caller = resource.headers.identity(&headers);
    let span = request_span(resource.collection.name(), "aggregate");
    let result = resource
        .search(&RequestParams::from(params))
        .instrument(span)
        .await;
    resource.headers.respond(&caller, result)
}

impl Resource for AggregationResource {
    fn collection_name(&self) -> &str {
        self.collection.name()
    }

    fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/", get(search_handler))
            .with_state(self)
    }

    fn ensure_indexes(&self) -> Vec<IndexSpec> {
        self.chain.ensure_indexes()
    }
}

