//! Operator traits
//!
//! A `QueryOperator` turns request parameters into a `QueryFragment`. It is
//! built once per resource and shared across concurrent requests, so it
//! holds configuration only; anything request-scoped is returned, never
//! stored.

use serde::{Deserialize, Serialize};

use super::errors::QueryResult;
use super::fragment::{ComposedQuery, QueryFragment};
use super::params::RequestParams;
use crate::document::Document;

/// Documents plus request-scoped metadata from a post-process hook
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Processed {
    pub documents: Vec<Document>,
    pub meta: Document,
}

impl Processed {
    pub fn unchanged(documents: Vec<Document>) -> Self {
        Self {
            documents,
            meta: Document::new(),
        }
    }
}

/// Index an operator relies on
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexSpec {
    pub field: String,
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            unique: false,
        }
    }

    pub fn unique(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            unique: true,
        }
    }
}

/// Read-side query operator
pub trait QueryOperator: Send + Sync {
    /// Operator name, used in logs
    fn name(&self) -> &str;

    /// Query parameters this operator consumes
    fn parameters(&self) -> Vec<String>;

    /// Compile parameters into a fragment. Pure.
    fn compile(&self, params: &RequestParams) -> QueryResult<QueryFragment>;

    /// Transform results after the store returns them
    fn post_process(
        &self,
        documents: Vec<Document>,
        _query: &ComposedQuery,
    ) -> QueryResult<Processed> {
        Ok(Processed::unchanged(documents))
    }

    /// Static response metadata
    fn meta(&self) -> Document {
        Document::new()
    }

    /// Indexes the produced criteria benefit from
    fn ensure_indexes(&self) -> Vec<IndexSpec> {
        Vec::new()
    }

    /// Whether the operator also applies to lookups by key
    fn applies_to_key_lookup(&self) -> bool {
        false
    }
}

/// Write-side operator validating and normalising request bodies
pub trait PayloadOperator: Send + Sync {
    fn name(&self) -> &str;

    /// Validate `payload`, returning the document to store
    fn validate(&self, payload: Document) -> QueryResult<Document>;
}
