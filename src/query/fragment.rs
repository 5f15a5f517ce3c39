//! Query fragments and their merge
//!
//! Each operator compiles a `QueryFragment`; a resource folds them, in
//! operator order, into one `ComposedQuery`. The merge is total:
//!
//! 1. A field present in both criteria is combined when both values are
//!    operator documents whose only shared operator, if any, is `$all`
//!    (the `$all` arrays are unioned); otherwise the later value replaces
//!    the earlier one.
//! 2. `$and` arrays are concatenated.
//! 3. Colliding `$or` clauses are moved into `$and`.
//! 4. A later non-empty sort replaces the earlier one; a later `skip`,
//!    `limit` or `properties` replaces the earlier one.
//!
//! A fragment carries criteria or a pipeline, never both. Mixing the two
//! across fragments is a server configuration error.

use serde_json::Value;

use super::errors::{QueryError, QueryResult};
use crate::document::Document;
use crate::store::matcher::is_operator_doc;
use crate::store::{FindOptions, SortSpec};

/// The filter part of a fragment
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Flat criteria document
    Criteria(Document),
    /// Aggregation pipeline stages
    Pipeline(Vec<Document>),
}

/// Output of one operator's compile step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFragment {
    pub filter: Option<Filter>,
    pub sort: Vec<SortSpec>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub properties: Option<Vec<String>>,
}

impl QueryFragment {
    /// A fragment contributing nothing
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn criteria(criteria: Document) -> Self {
        Self {
            filter: Some(Filter::Criteria(criteria)),
            ..Self::default()
        }
    }

    pub fn pipeline(stages: Vec<Document>) -> Self {
        Self {
            filter: Some(Filter::Pipeline(stages)),
            ..Self::default()
        }
    }

    pub fn with_sort(mut self, sort: Vec<SortSpec>) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_properties(mut self, properties: Vec<String>) -> Self {
        self.properties = Some(properties);
        self
    }
}

/// The merged query a resource executes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComposedQuery {
    pub criteria: Document,
    pub pipeline: Option<Vec<Document>>,
    pub sort: Vec<SortSpec>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub properties: Option<Vec<String>>,
}

impl ComposedQuery {
    /// Fold fragments in order
    pub fn compose(fragments: impl IntoIterator<Item = QueryFragment>) -> QueryResult<Self> {
        let mut query = Self::default();
        for fragment in fragments {
            query.merge(fragment)?;
        }
        Ok(query)
    }

    /// Merge one fragment on top of this query
    pub fn merge(&mut self, fragment: QueryFragment) -> QueryResult<()> {
        match fragment.filter {
            None => {}
            Some(Filter::Criteria(criteria)) if criteria.is_empty() => {}
            Some(Filter::Criteria(criteria)) => {
                if self.pipeline.is_some() {
                    return Err(QueryError::ConflictingFilters(
                        "criteria cannot be combined with an aggregation pipeline".to_string(),
                    ));
                }
                merge_criteria(&mut self.criteria, criteria);
            }
            Some(Filter::Pipeline(stages)) => {
                if self.pipeline.is_some() {
                    return Err(QueryError::ConflictingFilters(
                        "only one operator may produce a pipeline".to_string(),
                    ));
                }
                if !self.criteria.is_empty() {
                    return Err(QueryError::ConflictingFilters(
                        "a pipeline cannot be combined with criteria".to_string(),
                    ));
                }
                self.pipeline = Some(stages);
            }
        }

        if !fragment.sort.is_empty() {
            self.sort = fragment.sort;
        }
        if fragment.skip.is_some() {
            self.skip = fragment.skip;
        }
        if fragment.limit.is_some() {
            self.limit = fragment.limit;
        }
        if fragment.properties.is_some() {
            self.properties = fragment.properties;
        }
        Ok(())
    }

    /// Merge criteria that must win over every operator
    pub fn merge_overriding(&mut self, criteria: Document) -> QueryResult<()> {
        self.merge(QueryFragment::criteria(criteria))
    }

    pub fn is_pipeline(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Store options for a `find` with this query
    pub fn find_options(&self, hint: Option<Document>) -> FindOptions {
        FindOptions {
            sort: self.sort.clone(),
            skip: self.skip,
            limit: self.limit,
            projection: self.properties.clone(),
            hint,
        }
    }
}

/// Merge `incoming` criteria into `target`
pub fn merge_criteria(target: &mut Document, incoming: Document) {
    for (key, value) in incoming {
        match key.as_str() {
            "$and" => {
                let clauses = into_clauses(value);
                match target.get_mut("$and") {
                    Some(Value::Array(existing)) => existing.extend(clauses),
                    _ => {
                        target.insert(key, Value::Array(clauses));
                    }
                }
            }
            "$or" => match target.remove("$or") {
                Some(previous) => {
                    let mut first = Document::new();
                    first.insert("$or".to_string(), previous);
                    let mut second = Document::new();
                    second.insert("$or".to_string(), value);

                    let mut and = Document::new();
                    and.insert(
                        "$and".to_string(),
                        Value::Array(vec![Value::Object(first), Value::Object(second)]),
                    );
                    merge_criteria(target, and);
                }
                None => {
                    target.insert(key, value);
                }
            },
            _ => {
                let combine = target
                    .get(&key)
                    .map_or(false, |existing| combinable_operator_docs(existing, &value));
                if combine {
                    if let (Some(Value::Object(into)), Value::Object(from)) =
                        (target.get_mut(&key), value)
                    {
                        combine_operators(into, from);
                    }
                } else {
                    if let Some(existing) = target.get(&key) {
                        tracing::debug!(field = %key, previous = %existing, replacement = %value, "Criteria key overridden");
                    }
                    target.insert(key, value);
                }
            }
        }
    }
}

fn into_clauses(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Operator documents combine when every shared operator is `$all`
fn combinable_operator_docs(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(x), Value::Object(y)) if is_operator_doc(a) && is_operator_doc(b) => x
            .iter()
            .filter(|(k, _)| y.contains_key(k.as_str()))
            .all(|(k, v)| k == "$all" && v.is_array() && y[k.as_str()].is_array()),
        _ => false,
    }
}

fn combine_operators(into: &mut Document, from: Document) {
    for (op, operand) in from {
        match (into.get_mut(&op), operand) {
            (Some(Value::Array(required)), Value::Array(more)) if op == "$all" => {
                for item in more {
                    if !required.contains(&item) {
                        required.push(item);
                    }
                }
            }
            (_, operand) => {
                into.insert(op, operand);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::into_document;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        into_document(value).unwrap()
    }

    #[test]
    fn test_independent_keys_are_anded() {
        let query = ComposedQuery::compose([
            QueryFragment::criteria(doc(json!({"nelements": 2}))),
            QueryFragment::criteria(doc(json!({"band_gap": {"$gte": 1.0}}))),
        ])
        .unwrap();
        assert_eq!(
            Value::Object(query.criteria),
            json!({"nelements": 2, "band_gap": {"$gte": 1.0}})
        );
    }

    #[test]
    fn test_disjoint_operator_docs_combine() {
        let mut target = doc(json!({"band_gap": {"$gte": 1.0}}));
        merge_criteria(&mut target, doc(json!({"band_gap": {"$lte": 2.0}})));
        assert_eq!(
            Value::Object(target),
            json!({"band_gap": {"$gte": 1.0, "$lte": 2.0}})
        );
    }

    #[test]
    fn test_all_requirements_are_unioned() {
        let mut target = doc(json!({"elements": {"$all": ["Si"]}, "nelements": 2}));
        merge_criteria(
            &mut target,
            doc(json!({"elements": {"$all": ["O", "Si"], "$nin": ["Fe"]}})),
        );
        assert_eq!(
            Value::Object(target),
            json!({"elements": {"$all": ["Si", "O"], "$nin": ["Fe"]}, "nelements": 2})
        );
    }

    #[test]
    fn test_collision_last_writer_wins() {
        let mut target = doc(json!({"nelements": 2}));
        merge_criteria(&mut target, doc(json!({"nelements": {"$gte": 3}})));
        assert_eq!(Value::Object(target), json!({"nelements": {"$gte": 3}}));

        let mut target = doc(json!({"band_gap": {"$gte": 1.0}}));
        merge_criteria(&mut target, doc(json!({"band_gap": {"$gte": 2.0}})));
        assert_eq!(Value::Object(target), json!({"band_gap": {"$gte": 2.0}}));
    }

    #[test]
    fn test_logical_operators_are_not_dropped() {
        let mut target = doc(json!({"$and": [{"a": 1}], "$or": [{"b": 1}, {"b": 2}]}));
        merge_criteria(
            &mut target,
            doc(json!({"$and": [{"c": 1}], "$or": [{"d": 1}, {"d": 2}]})),
        );
        assert_eq!(
            Value::Object(target),
            json!({"$and": [
                {"a": 1},
                {"c": 1},
                {"$or": [{"b": 1}, {"b": 2}]},
                {"$or": [{"d": 1}, {"d": 2}]}
            ]})
        );
    }

    #[test]
    fn test_sort_and_paging_replace() {
        let query = ComposedQuery::compose([
            QueryFragment::empty()
                .with_sort(vec![SortSpec::asc("a")])
                .with_limit(10),
            QueryFragment::empty().with_skip(5),
            QueryFragment::empty()
                .with_sort(vec![SortSpec::desc("b")])
                .with_limit(20),
        ])
        .unwrap();
        assert_eq!(query.sort, vec![SortSpec::desc("b")]);
        assert_eq!(query.skip, Some(5));
        assert_eq!(query.limit, Some(20));
    }

    #[test]
    fn test_pipeline_and_criteria_conflict() {
        let stages = vec![doc(json!({"$match": {}}))];
        let err = ComposedQuery::compose([
            QueryFragment::criteria(doc(json!({"a": 1}))),
            QueryFragment::pipeline(stages.clone()),
        ])
        .unwrap_err();
        assert!(matches!(err, QueryError::ConflictingFilters(_)));

        let err = ComposedQuery::compose([
            QueryFragment::pipeline(stages.clone()),
            QueryFragment::pipeline(stages),
        ])
        .unwrap_err();
        assert!(matches!(err, QueryError::ConflictingFilters(_)));
    }

    #[test]
    fn test_empty_criteria_is_a_no_op_next_to_pipeline() {
        let query = ComposedQuery::compose([
            QueryFragment::pipeline(vec![doc(json!({"$limit": 1}))]),
            QueryFragment::criteria(Document::new()),
        ])
        .unwrap();
        assert!(query.is_pipeline());
    }
}
