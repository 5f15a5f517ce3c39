//! Lookup of many documents by key (`<key>s=mp-1,mp-2`)

use std::collections::HashMap;

use serde_json::{json, Value};

use super::super::errors::{QueryError, QueryResult};
use super::super::fragment::{ComposedQuery, QueryFragment};
use super::super::operator::{IndexSpec, Processed, QueryOperator};
use super::super::params::RequestParams;
use crate::document::{get_path, Document};

/// Filter on a list of key values. Without an explicit sort, results come
/// back in the requested order.
#[derive(Debug, Clone)]
pub struct KeysQuery {
    key: String,
    param: String,
    max_keys: usize,
}

impl KeysQuery {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            param: format!("{}s", key),
            key,
            max_keys: 1000,
        }
    }

    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = max_keys;
        self
    }

    fn requested_order(&self, query: &ComposedQuery) -> Option<HashMap<String, usize>> {
        let keys = query.criteria.get(&self.key)?.get("$in")?.as_array()?;
        Some(
            keys.iter()
                .filter_map(Value::as_str)
                .enumerate()
                .map(|(i, k)| (k.to_string(), i))
                .collect(),
        )
    }
}

impl QueryOperator for KeysQuery {
    fn name(&self) -> &str {
        "keys"
    }

    fn parameters(&self) -> Vec<String> {
        vec![self.param.clone()]
    }

    fn compile(&self, params: &RequestParams) -> QueryResult<QueryFragment> {
        let keys = match params.get_list(&self.param) {
            Some(keys) if !keys.is_empty() => keys,
            _ => return Ok(QueryFragment::empty()),
        };
        if keys.len() > self.max_keys {
            return Err(QueryError::LimitExceeded {
                param: self.param.clone(),
                value: keys.len() as u64,
                max: self.max_keys as u64,
            });
        }

        let mut criteria = Document::new();
        criteria.insert(self.key.clone(), json!({ "$in": keys }));
        Ok(QueryFragment::criteria(criteria))
    }

    fn post_process(
        &self,
        mut documents: Vec<Document>,
        query: &ComposedQuery,
    ) -> QueryResult<Processed> {
        if query.sort.is_empty() {
            if let Some(order) = self.requested_order(query) {
                let position = |doc: &Document| {
                    get_path(doc, &self.key)
                        .and_then(Value::as_str)
                        .and_then(|k| order.get(k).copied())
                        .unwrap_or(usize::MAX)
                };
                documents.sort_by_key(|doc| position(doc));
            }
        }
        Ok(Processed::unchanged(documents))
    }

    fn ensure_indexes(&self) -> Vec<IndexSpec> {
        vec![IndexSpec::unique(self.key.as_str())]
    }
}
