//! # Resources
//!
//! A resource binds a collection, its document schema, an ordered operator
//! chain, an optional hint scheme and a header processor into HTTP routes.
//! Resources are immutable once built and shared across requests via `Arc`.
//!
//! | Kind | Routes |
//! |------|--------|
//! | [`ReadOnlyResource`] | `GET /`, `GET /:key` |
//! | [`SubmissionResource`] | `GET /`, `GET /:id`, `POST /`, `PATCH /:id` |
//! | [`AggregationResource`] | `GET /` |
//! | [`ObjectUrlResource`] | `GET /object/*key` |

mod aggregation;
mod envelope;
mod errors;
mod headers;
mod object_url;
mod read;
pub mod signing;
mod submission;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use uuid::Uuid;

pub use aggregation::AggregationResource;
pub use envelope::Envelope;
pub use errors::{ErrorResponse, ResourceError, ResourceResult};
pub use headers::{
    CallerIdentity, HeaderProcessor, LicensePolicy, AUTHENTICATED_GROUPS, BYPASS_RATE_LIMIT,
    CONSUMER_GROUPS, CONSUMER_ID,
};
pub use object_url::ObjectUrlResource;
pub use read::ReadOnlyResource;
pub use signing::{ObjectSigner, ObjectUrlGrant};
pub use submission::{SubmissionResource, SUBMISSION_ID};

use crate::document::Document;
use crate::query::{ComposedQuery, Hints, IndexSpec};
use crate::schema::DocumentSchema;
use crate::store::{Collection, StoreResult};

/// Settings shared by every resource of a deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSettings {
    /// Reported in every response's `meta`
    pub api_version: String,
    /// Bound on each store call
    pub timeout: Duration,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            api_version: env!("CARGO_PKG_VERSION").to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// A collection exposed over HTTP
pub trait Resource: Send + Sync + 'static {
    /// Name of the backing collection
    fn collection_name(&self) -> &str;

    /// Routes of this resource, relative to its prefix
    fn router(self: Arc<Self>) -> Router;

    /// Indexes the resource's operators rely on
    fn ensure_indexes(&self) -> Vec<IndexSpec>;
}

/// Span carrying a fresh request id
pub(crate) fn request_span(collection: &str, operation: &'static str) -> tracing::Span {
    tracing::info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        collection = %collection,
        operation
    )
}

/// Run a store call under the resource timeout. On expiry the store future
/// is dropped.
pub(crate) async fn bounded<F, T>(
    timeout: Duration,
    collection: &str,
    operation: &str,
    call: F,
) -> ResourceResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            tracing::error!(collection, operation, error = %err, "Store call failed");
            Err(err.into())
        }
        Err(_) => {
            tracing::warn!(
                collection,
                operation,
                timeout_ms = timeout.as_millis() as u64,
                "Store call timed out"
            );
            Err(ResourceError::Timeout(timeout))
        }
    }
}

/// `find` and `count` for one composed query, concurrently, under one timeout
pub(crate) async fn find_with_count(
    collection: &dyn Collection,
    query: &ComposedQuery,
    hints: Hints,
    timeout: Duration,
) -> ResourceResult<(Vec<Document>, u64)> {
    let options = query.find_options(hints.hint);
    let count_hint = hints.count_hint;
    bounded(timeout, collection.name(), "find", async {
        tokio::try_join!(
            collection.find(&query.criteria, &options),
            collection.count(&query.criteria, count_hint.as_ref())
        )
    })
    .await
}

/// Check returned documents against the schema unless validation is off
pub(crate) fn validate_documents(
    schema: &DocumentSchema,
    documents: &[Document],
    enabled: bool,
) -> ResourceResult<()> {
    if !enabled {
        return Ok(());
    }
    for document in documents {
        schema.validate_partial(document)?;
    }
    Ok(())
}
