//! Sorting by `_sort_fields`

use std::collections::BTreeSet;

use super::super::errors::{QueryError, QueryResult};
use super::super::fragment::QueryFragment;
use super::super::operator::{IndexSpec, QueryOperator};
use super::super::params::RequestParams;
use crate::store::SortSpec;

pub const SORT_FIELDS: &str = "_sort_fields";

/// Comma-separated sort keys, `-` prefix for descending.
///
/// Requesting more than `max_num` fields is an error. Fields outside the
/// allow-list are dropped silently.
#[derive(Debug, Clone)]
pub struct SortQuery {
    max_num: usize,
    allowed: Option<BTreeSet<String>>,
}

impl SortQuery {
    pub fn new(max_num: usize) -> Self {
        Self {
            max_num,
            allowed: None,
        }
    }

    pub fn with_allowed_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    fn is_allowed(&self, field: &str) -> bool {
        self.allowed
            .as_ref()
            .map_or(true, |allowed| allowed.contains(field))
    }
}

impl Default for SortQuery {
    fn default() -> Self {
        Self::new(2)
    }
}

impl QueryOperator for SortQuery {
    fn name(&self) -> &str {
        "sort"
    }

    fn parameters(&self) -> Vec<String> {
        vec![SORT_FIELDS.to_string()]
    }

    fn compile(&self, params: &RequestParams) -> QueryResult<QueryFragment> {
        let requested = match params.get_list(SORT_FIELDS) {
            Some(fields) => fields,
            None => return Ok(QueryFragment::empty()),
        };

        if requested.len() > self.max_num {
            return Err(QueryError::TooManySortFields {
                requested: requested.len(),
                max: self.max_num,
            });
        }

        let mut seen = BTreeSet::new();
        let mut sort = Vec::with_capacity(requested.len());
        for entry in requested {
            let spec = match entry.strip_prefix('-') {
                Some(field) => SortSpec::desc(field.trim()),
                None => SortSpec::asc(entry.trim_start_matches('+')),
            };
            if spec.field.is_empty() {
                return Err(QueryError::invalid(SORT_FIELDS, "empty field name"));
            }
            if !self.is_allowed(&spec.field) {
                tracing::debug!(field = %spec.field, "Dropping sort field outside the allow-list");
                continue;
            }
            if seen.insert(spec.field.clone()) {
                sort.push(spec);
            }
        }

        Ok(QueryFragment::empty().with_sort(sort))
    }

    fn ensure_indexes(&self) -> Vec<IndexSpec> {
        self.allowed
            .iter()
            .flatten()
            .map(IndexSpec::new)
            .collect()
    }
}
