//! Collection abstraction
//!
//! The document store is an external collaborator. Resources talk to it only
//! through this trait. Every method returns a boxed future so resources can
//! hold `Arc<dyn Collection>` and bound each call with a timeout; dropping
//! the future cancels the operation.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use super::errors::StoreResult;
use crate::document::Document;

/// Boxed future returned by collection operations
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Mongo-style numeric direction (`1` / `-1`)
    pub fn as_i32(&self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// A single sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Options for `find`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Vec<SortSpec>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    /// Field paths to return (`None` = whole document)
    pub projection: Option<Vec<String>>,
    /// Planner hint
    pub hint: Option<Document>,
}

/// A keyed document collection
pub trait Collection: Send + Sync {
    /// Collection name
    fn name(&self) -> &str;

    /// Name of the key field
    fn key(&self) -> &str;

    /// Query documents matching `criteria`
    fn find<'a>(
        &'a self,
        criteria: &'a Document,
        options: &'a FindOptions,
    ) -> StoreFuture<'a, Vec<Document>>;

    /// Fetch one document by key value
    fn find_one<'a>(
        &'a self,
        key: &'a str,
        projection: Option<&'a [String]>,
    ) -> StoreFuture<'a, Option<Document>>;

    /// Count documents matching `criteria`
    fn count<'a>(
        &'a self,
        criteria: &'a Document,
        hint: Option<&'a Document>,
    ) -> StoreFuture<'a, u64>;

    /// Run an aggregation pipeline
    fn aggregate<'a>(&'a self, pipeline: &'a [Document]) -> StoreFuture<'a, Vec<Document>>;

    /// Insert or replace the document with the same key, atomically
    fn upsert<'a>(&'a self, document: Document) -> StoreFuture<'a, ()>;
}
