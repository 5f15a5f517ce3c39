//! Ordered operator list of a resource

use std::collections::BTreeSet;
use std::sync::Arc;

use super::errors::{QueryError, QueryResult};
use super::fragment::ComposedQuery;
use super::operator::{IndexSpec, Processed, QueryOperator};
use super::params::RequestParams;
use crate::document::Document;

/// Operators in precedence order (later wins on key collisions)
#[derive(Clone, Default)]
pub struct OperatorChain {
    operators: Vec<Arc<dyn QueryOperator>>,
}

impl OperatorChain {
    pub fn new(operators: Vec<Arc<dyn QueryOperator>>) -> Self {
        Self { operators }
    }

    pub fn push(&mut self, operator: Arc<dyn QueryOperator>) {
        self.operators.push(operator);
    }

    pub fn operators(&self) -> &[Arc<dyn QueryOperator>] {
        &self.operators
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Operators that apply to lookups by key
    pub fn key_lookup(&self) -> OperatorChain {
        Self::new(
            self.operators
                .iter()
                .filter(|op| op.applies_to_key_lookup())
                .cloned()
                .collect(),
        )
    }

    /// Union of the parameters all operators consume
    pub fn parameters(&self) -> BTreeSet<String> {
        self.operators
            .iter()
            .flat_map(|op| op.parameters())
            .collect()
    }

    /// Reject parameters no operator consumes
    pub fn check_parameters(&self, params: &RequestParams) -> QueryResult<()> {
        let known = self.parameters();
        let mut unknown: Vec<String> = params
            .names()
            .filter(|name| !known.contains(*name))
            .map(String::from)
            .collect();
        if unknown.is_empty() {
            return Ok(());
        }
        unknown.sort();
        Err(QueryError::UnknownParameters(unknown))
    }

    /// Check, compile and merge every operator, then `overriding` criteria
    pub fn compose(
        &self,
        params: &RequestParams,
        overriding: Option<Document>,
    ) -> QueryResult<ComposedQuery> {
        self.check_parameters(params)?;

        let mut query = ComposedQuery::default();
        for operator in &self.operators {
            let fragment = operator.compile(params)?;
            query.merge(fragment)?;
        }
        if let Some(criteria) = overriding {
            query.merge_overriding(criteria)?;
        }

        tracing::debug!(
            criteria = %serde_json::Value::Object(query.criteria.clone()),
            pipeline = query.is_pipeline(),
            skip = ?query.skip,
            limit = ?query.limit,
            "Composed query"
        );
        Ok(query)
    }

    /// Run post-process hooks in reverse order, collecting metadata
    pub fn post_process(
        &self,
        documents: Vec<Document>,
        query: &ComposedQuery,
    ) -> QueryResult<Processed> {
        let mut documents = documents;
        let mut meta = Document::new();
        for operator in self.operators.iter().rev() {
            let processed = operator.post_process(documents, query)?;
            documents = processed.documents;
            meta.extend(processed.meta);
        }
        Ok(Processed { documents, meta })
    }

    /// Merged static metadata of all operators
    pub fn meta(&self) -> Document {
        let mut meta = Document::new();
        for operator in &self.operators {
            meta.extend(operator.meta());
        }
        meta
    }

    /// Deduplicated index specs of all operators
    pub fn ensure_indexes(&self) -> Vec<IndexSpec> {
        let set: BTreeSet<IndexSpec> = self
            .operators
            .iter()
            .flat_map(|op| op.ensure_indexes())
            .collect();
        set.into_iter().collect()
    }
}

impl std::fmt::Debug for OperatorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.operators.iter().map(|op| op.name()))
            .finish()
    }
}
