//! In-memory collection
//!
//! Stands in for the external document store in tests and in the bundled
//! binary. Criteria, sorting and pipelines are evaluated by `matcher` and
//! `pipeline`; planner hints are accepted and ignored.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde_json::Value;

use super::collection::{Collection, FindOptions, StoreFuture};
use super::errors::{StoreError, StoreResult};
use super::matcher::{sort_documents, CompiledCriteria};
use super::pipeline::run_pipeline;
use crate::document::{get_path, project, Document};

/// A collection held in process memory
pub struct MemoryCollection {
    name: String,
    key: String,
    docs: RwLock<Vec<Document>>,
    latency: Option<Duration>,
}

impl MemoryCollection {
    /// Create an empty collection keyed on `key`
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            docs: RwLock::new(Vec::new()),
            latency: None,
        }
    }

    /// Create a collection pre-populated with documents
    pub fn with_documents(
        name: impl Into<String>,
        key: impl Into<String>,
        docs: impl IntoIterator<Item = Document>,
    ) -> Self {
        let collection = Self::new(name, key);
        if let Ok(mut store) = collection.docs.write() {
            store.extend(docs);
        }
        collection
    }

    /// Delay every operation by `latency` (simulates a slow backend)
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Load a JSON array of documents from `path`
    pub fn load_json(&self, path: &Path) -> StoreResult<usize> {
        let contents = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&contents)?;
        let items = match value {
            Value::Array(items) => items,
            _ => {
                return Err(StoreError::Io(format!(
                    "{} must contain a JSON array",
                    path.display()
                )))
            }
        };

        let mut loaded = 0;
        let mut store = self.write()?;
        for item in items {
            match item {
                Value::Object(doc) => {
                    Self::replace_or_push(&mut store, &self.key, doc);
                    loaded += 1;
                }
                _ => {
                    return Err(StoreError::Io(format!(
                        "{} contains a non-object entry",
                        path.display()
                    )))
                }
            }
        }
        Ok(loaded)
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.docs.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Vec<Document>>> {
        self.docs
            .read()
            .map_err(|_| StoreError::Internal("Lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Vec<Document>>> {
        self.docs
            .write()
            .map_err(|_| StoreError::Internal("Lock poisoned".to_string()))
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn key_matches(doc: &Document, key_field: &str, key: &str) -> bool {
        match get_path(doc, key_field) {
            Some(Value::String(s)) => s == key,
            Some(other) => other.to_string() == key,
            None => false,
        }
    }

    fn replace_or_push(store: &mut Vec<Document>, key_field: &str, doc: Document) {
        let key = get_path(&doc, key_field).cloned();
        let existing = key.and_then(|key| {
            store
                .iter()
                .position(|d| get_path(d, key_field) == Some(&key))
        });
        match existing {
            Some(index) => store[index] = doc,
            None => store.push(doc),
        }
    }

    fn find_sync(&self, criteria: &Document, options: &FindOptions) -> StoreResult<Vec<Document>> {
        let compiled = CompiledCriteria::new(criteria)?;
        let store = self.read()?;
        let mut found = Vec::new();
        for doc in store.iter() {
            if compiled.matches(doc)? {
                found.push(doc.clone());
            }
        }
        drop(store);

        sort_documents(&mut found, &options.sort);

        let skip = options.skip.unwrap_or(0) as usize;
        let found = found.into_iter().skip(skip);
        let found: Vec<Document> = match options.limit {
            Some(limit) => found.take(limit as usize).collect(),
            None => found.collect(),
        };

        Ok(match &options.projection {
            Some(fields) => found.iter().map(|doc| project(doc, fields)).collect(),
            None => found,
        })
    }
}

impl Collection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn find<'a>(
        &'a self,
        criteria: &'a Document,
        options: &'a FindOptions,
    ) -> StoreFuture<'a, Vec<Document>> {
        Box::pin(async move {
            self.simulate_latency().await;
            self.find_sync(criteria, options)
        })
    }

    fn find_one<'a>(
        &'a self,
        key: &'a str,
        projection: Option<&'a [String]>,
    ) -> StoreFuture<'a, Option<Document>> {
        Box::pin(async move {
            self.simulate_latency().await;
            let store = self.read()?;
            let found = store
                .iter()
                .find(|doc| Self::key_matches(doc, &self.key, key))
                .map(|doc| match projection {
                    Some(fields) => project(doc, fields),
                    None => doc.clone(),
                });
            Ok(found)
        })
    }

    fn count<'a>(
        &'a self,
        criteria: &'a Document,
        _hint: Option<&'a Document>,
    ) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            self.simulate_latency().await;
            let compiled = CompiledCriteria::new(criteria)?;
            let store = self.read()?;
            let mut total = 0;
            for doc in store.iter() {
                if compiled.matches(doc)? {
                    total += 1;
                }
            }
            Ok(total)
        })
    }

    fn aggregate<'a>(&'a self, pipeline: &'a [Document]) -> StoreFuture<'a, Vec<Document>> {
        Box::pin(async move {
            self.simulate_latency().await;
            let docs = self.read()?.clone();
            run_pipeline(docs, pipeline)
        })
    }

    fn upsert<'a>(&'a self, document: Document) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.simulate_latency().await;
            if get_path(&document, &self.key).is_none() {
                return Err(StoreError::InvalidQuery(format!(
                    "document is missing key field '{}'",
                    self.key
                )));
            }
            let mut store = self.write()?;
            Self::replace_or_push(&mut store, &self.key, document);
            Ok(())
        })
    }
}

/// Named in-memory collections
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Arc<MemoryCollection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the collection `name` keyed on `key`
    pub fn collection(&self, name: &str, key: &str) -> StoreResult<Arc<MemoryCollection>> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::Internal("Lock poisoned".to_string()))?;
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCollection::new(name, key)));
        Ok(collection.clone())
    }

    /// Get or create `name`, seeding it from `<dir>/<name>.json` when present
    pub fn seeded_collection(
        &self,
        name: &str,
        key: &str,
        dir: Option<&Path>,
    ) -> StoreResult<Arc<MemoryCollection>> {
        let collection = self.collection(name, key)?;
        if let Some(dir) = dir {
            let path = dir.join(format!("{}.json", name));
            if path.exists() {
                let loaded = collection.load_json(&path)?;
                tracing::info!(collection = name, loaded, path = %path.display(), "Seeded collection");
            }
        }
        Ok(collection)
    }

    /// Names of all collections
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .read()
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}
