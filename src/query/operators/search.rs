//! Pipeline-producing search operators for aggregation resources
//!
//! Both operators page inside a `$facet` stage that also counts every match,
//! and unpack the facet in `post_process`.

use serde_json::{json, Value};

use super::super::errors::{QueryError, QueryResult};
use super::super::fragment::{ComposedQuery, QueryFragment};
use super::super::operator::{IndexSpec, Processed, QueryOperator};
use super::super::params::RequestParams;
use super::pagination::{LIMIT, SKIP};
use crate::document::{into_document, Document};

pub const QUERY: &str = "q";
pub const VECTOR: &str = "vector";

const DATA_FACET: &str = "data";
const COUNT_FACET: &str = "meta";
pub const TOTAL_DOC: &str = "total_doc";

/// Longest accepted text search string, in characters
pub const MAX_QUERY_LEN: usize = 200;

/// Skip/limit handling shared by the search operators
#[derive(Debug, Clone, Copy)]
struct Paging {
    default_limit: u64,
    max_limit: u64,
}

impl Paging {
    fn parse(&self, params: &RequestParams) -> QueryResult<(u64, u64)> {
        let skip = params.get_u64(SKIP)?.unwrap_or(0);
        let limit = params.get_u64(LIMIT)?.unwrap_or(self.default_limit);
        if limit == 0 {
            return Err(QueryError::invalid(LIMIT, "must be at least 1"));
        }
        if limit > self.max_limit {
            return Err(QueryError::LimitExceeded {
                param: LIMIT.to_string(),
                value: limit,
                max: self.max_limit,
            });
        }
        Ok((skip, limit))
    }
}

fn stage(value: Value) -> Document {
    into_document(value).unwrap_or_default()
}

fn facet_stage(skip: u64, limit: u64) -> Document {
    stage(json!({
        "$facet": {
            DATA_FACET: [{"$skip": skip}, {"$limit": limit}],
            COUNT_FACET: [{"$count": TOTAL_DOC}]
        }
    }))
}

/// Split a `$facet` result into the page and its total count
fn unpack_facet(mut documents: Vec<Document>) -> QueryResult<Processed> {
    let mut facet = match documents.len() {
        0 => Document::new(),
        1 => documents.remove(0),
        n => {
            return Err(QueryError::PostProcess(format!(
                "expected one facet document, got {}",
                n
            )))
        }
    };

    let data = match facet.remove(DATA_FACET) {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(doc) => Ok(doc),
                _ => Err(QueryError::PostProcess("facet data must be documents".into())),
            })
            .collect::<QueryResult<Vec<_>>>()?,
        None => Vec::new(),
        Some(_) => return Err(QueryError::PostProcess("facet data must be an array".into())),
    };

    let total = facet
        .get(COUNT_FACET)
        .and_then(Value::as_array)
        .and_then(|counts| counts.first())
        .and_then(|count| count.get(TOTAL_DOC))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let mut meta = Document::new();
    meta.insert(TOTAL_DOC.to_string(), json!(total));
    Ok(Processed {
        documents: data,
        meta,
    })
}

/// Case-insensitive substring search over text fields
#[derive(Debug, Clone)]
pub struct TextSearchQuery {
    fields: Vec<String>,
    paging: Paging,
}

impl TextSearchQuery {
    pub fn new<I, S>(fields: I, default_limit: u64, max_limit: u64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            paging: Paging {
                default_limit: default_limit.min(max_limit),
                max_limit,
            },
        }
    }
}

impl QueryOperator for TextSearchQuery {
    fn name(&self) -> &str {
        "text_search"
    }

    fn parameters(&self) -> Vec<String> {
        vec![QUERY.to_string(), SKIP.to_string(), LIMIT.to_string()]
    }

    fn compile(&self, params: &RequestParams) -> QueryResult<QueryFragment> {
        let text = params
            .get(QUERY)
            .ok_or_else(|| QueryError::invalid(QUERY, "a search string is required"))?;
        if text.chars().count() > MAX_QUERY_LEN {
            return Err(QueryError::invalid(
                QUERY,
                format!("must be at most {} characters", MAX_QUERY_LEN),
            ));
        }
        let (skip, limit) = self.paging.parse(params)?;

        let pattern = regex::escape(text);
        let clauses: Vec<Value> = self
            .fields
            .iter()
            .map(|field| json!({ field.as_str(): {"$regex": pattern, "$options": "i"} }))
            .collect();

        Ok(QueryFragment::pipeline(vec![
            stage(json!({"$match": {"$or": clauses}})),
            facet_stage(skip, limit),
        ]))
    }

    fn post_process(&self, documents: Vec<Document>, _query: &ComposedQuery) -> QueryResult<Processed> {
        unpack_facet(documents)
    }

    fn ensure_indexes(&self) -> Vec<IndexSpec> {
        self.fields.iter().map(|f| IndexSpec::new(f.as_str())).collect()
    }
}

/// Nearest neighbours by cosine similarity over an embedding field
#[derive(Debug, Clone)]
pub struct VectorSearchQuery {
    path: String,
    dimensions: usize,
    num_candidates: u64,
    paging: Paging,
}

impl VectorSearchQuery {
    pub fn new(path: impl Into<String>, dimensions: usize, default_limit: u64, max_limit: u64) -> Self {
        Self {
            path: path.into(),
            dimensions,
            num_candidates: max_limit.saturating_mul(10),
            paging: Paging {
                default_limit: default_limit.min(max_limit),
                max_limit,
            },
        }
    }

    pub fn with_num_candidates(mut self, num_candidates: u64) -> Self {
        self.num_candidates = num_candidates;
        self
    }

    fn parse_vector(&self, params: &RequestParams) -> QueryResult<Vec<f64>> {
        let raw = params
            .get_list(VECTOR)
            .ok_or_else(|| QueryError::invalid(VECTOR, "a query vector is required"))?;
        let vector = raw
            .iter()
            .map(|v| {
                v.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .ok_or_else(|| QueryError::invalid(VECTOR, format!("'{}' is not a number", v)))
            })
            .collect::<QueryResult<Vec<f64>>>()?;

        if vector.len() != self.dimensions {
            return Err(QueryError::invalid(
                VECTOR,
                format!("expected {} components, got {}", self.dimensions, vector.len()),
            ));
        }
        if vector.iter().all(|v| *v == 0.0) {
            return Err(QueryError::invalid(VECTOR, "must not be the zero vector"));
        }
        Ok(vector)
    }
}

impl QueryOperator for VectorSearchQuery {
    fn name(&self) -> &str {
        "vector_search"
    }

    fn parameters(&self) -> Vec<String> {
        vec![VECTOR.to_string(), SKIP.to_string(), LIMIT.to_string()]
    }

    fn compile(&self, params: &RequestParams) -> QueryResult<QueryFragment> {
        let vector = self.parse_vector(params)?;
        let (skip, limit) = self.paging.parse(params)?;

        Ok(QueryFragment::pipeline(vec![
            stage(json!({"$vectorSearch": {
                "path": self.path,
                "queryVector": vector,
                "limit": self.num_candidates
            }})),
            facet_stage(skip, limit),
        ]))
    }

    fn post_process(&self, documents: Vec<Document>, _query: &ComposedQuery) -> QueryResult<Processed> {
        unpack_facet(documents)
    }
}
