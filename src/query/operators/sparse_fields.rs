//! Field projection by `_fields` / `_all_fields`

use std::sync::Arc;

use super::super::errors::{QueryError, QueryResult};
use super::super::fragment::QueryFragment;
use super::super::operator::QueryOperator;
use super::super::params::RequestParams;
use crate::schema::DocumentSchema;

pub const FIELDS: &str = "_fields";
pub const ALL_FIELDS: &str = "_all_fields";

/// Projection onto schema fields. The key field is always returned.
#[derive(Debug, Clone)]
pub struct SparseFieldsQuery {
    schema: Arc<DocumentSchema>,
    key: String,
    default_fields: Vec<String>,
}

impl SparseFieldsQuery {
    /// `default_fields` empty means whole documents by default
    pub fn new(schema: Arc<DocumentSchema>, key: impl Into<String>, default_fields: Vec<String>) -> Self {
        Self {
            schema,
            key: key.into(),
            default_fields,
        }
    }

    fn with_key(&self, mut fields: Vec<String>) -> Vec<String> {
        if !fields.iter().any(|f| f == &self.key) {
            fields.insert(0, self.key.clone());
        }
        let mut seen = std::collections::HashSet::new();
        fields.retain(|f| seen.insert(f.clone()));
        fields
    }
}

impl QueryOperator for SparseFieldsQuery {
    fn name(&self) -> &str {
        "sparse_fields"
    }

    fn parameters(&self) -> Vec<String> {
        vec![FIELDS.to_string(), ALL_FIELDS.to_string()]
    }

    fn compile(&self, params: &RequestParams) -> QueryResult<QueryFragment> {
        if params.get_bool(ALL_FIELDS)?.unwrap_or(false) {
            return Ok(QueryFragment::empty());
        }

        let fields = match params.get_list(FIELDS) {
            Some(fields) => {
                for field in &fields {
                    if !self.schema.has_path(field) {
                        return Err(QueryError::UnknownField {
                            param: FIELDS.to_string(),
                            field: field.clone(),
                        });
                    }
                }
                fields
            }
            None if self.default_fields.is_empty() => return Ok(QueryFragment::empty()),
            None => self.default_fields.clone(),
        };

        Ok(QueryFragment::empty().with_properties(self.with_key(fields)))
    }

    fn applies_to_key_lookup(&self) -> bool {
        true
    }
}
