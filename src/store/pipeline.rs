//! Aggregation pipeline evaluation
//!
//! Stages: `$match`, `$sort`, `$skip`, `$limit`, `$project`, `$count`,
//! `$facet` and `$vectorSearch` (cosine similarity, first stage only).

use std::cmp::Ordering;

use serde_json::{json, Value};

use super::collection::{SortDirection, SortSpec};
use super::errors::{StoreError, StoreResult};
use super::matcher::{sort_documents, CompiledCriteria};
use crate::document::{get_path, project, remove_path, Document};

/// Field holding the similarity score added by `$vectorSearch`
pub const SEARCH_SCORE_FIELD: &str = "search_score";

/// Run `stages` over `docs` in order
pub fn run_pipeline(mut docs: Vec<Document>, stages: &[Document]) -> StoreResult<Vec<Document>> {
    for (index, stage) in stages.iter().enumerate() {
        let (name, spec) = single_entry(stage)?;

        docs = match name.as_str() {
            "$match" => {
                let criteria = CompiledCriteria::new(expect_doc(name, spec)?)?;
                let mut kept = Vec::with_capacity(docs.len());
                for doc in docs {
                    if criteria.matches(&doc)? {
                        kept.push(doc);
                    }
                }
                kept
            }
            "$sort" => {
                let sort = parse_sort(expect_doc(name, spec)?)?;
                sort_documents(&mut docs, &sort);
                docs
            }
            "$skip" => {
                let n = expect_count(name, spec)?;
                docs.into_iter().skip(n).collect()
            }
            "$limit" => {
                let n = expect_count(name, spec)?;
                docs.into_iter().take(n).collect()
            }
            "$project" => project_stage(docs, expect_doc(name, spec)?),
            "$count" => {
                let field = spec
                    .as_str()
                    .ok_or_else(|| StoreError::InvalidQuery("$count expects a field name".into()))?;
                if docs.is_empty() {
                    Vec::new()
                } else {
                    let mut out = Document::new();
                    out.insert(field.to_string(), json!(docs.len()));
                    vec![out]
                }
            }
            "$facet" => {
                let mut out = Document::new();
                for (output, sub) in expect_doc(name, spec)? {
                    let sub_stages = stage_list(sub)?;
                    let result = run_pipeline(docs.clone(), &sub_stages)?;
                    out.insert(
                        output.clone(),
                        Value::Array(result.into_iter().map(Value::Object).collect()),
                    );
                }
                vec![out]
            }
            "$vectorSearch" => {
                if index != 0 {
                    return Err(StoreError::InvalidQuery(
                        "$vectorSearch must be the first stage".to_string(),
                    ));
                }
                vector_search(docs, expect_doc(name, spec)?)?
            }
            other => return Err(StoreError::UnsupportedStage(other.to_string())),
        };
    }

    Ok(docs)
}

fn single_entry(stage: &Document) -> StoreResult<(&String, &Value)> {
    let mut entries = stage.iter();
    match (entries.next(), entries.next()) {
        (Some(entry), None) => Ok(entry),
        _ => Err(StoreError::InvalidQuery(
            "pipeline stages must have exactly one key".to_string(),
        )),
    }
}

fn expect_doc<'a>(name: &str, spec: &'a Value) -> StoreResult<&'a Document> {
    spec.as_object()
        .ok_or_else(|| StoreError::InvalidQuery(format!("{} expects an object", name)))
}

fn expect_count(name: &str, spec: &Value) -> StoreResult<usize> {
    spec.as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| StoreError::InvalidQuery(format!("{} expects a non-negative integer", name)))
}

fn stage_list(value: &Value) -> StoreResult<Vec<Document>> {
    value
        .as_array()
        .ok_or_else(|| StoreError::InvalidQuery("$facet outputs must be stage arrays".into()))?
        .iter()
        .map(|stage| {
            stage
                .as_object()
                .cloned()
                .ok_or_else(|| StoreError::InvalidQuery("pipeline stages must be objects".into()))
        })
        .collect()
}

fn parse_sort(spec: &Document) -> StoreResult<Vec<SortSpec>> {
    spec.iter()
        .map(|(field, direction)| {
            let direction = match direction.as_i64() {
                Some(1) => SortDirection::Asc,
                Some(-1) => SortDirection::Desc,
                _ => {
                    return Err(StoreError::InvalidQuery(format!(
                        "invalid sort direction for '{}'",
                        field
                    )))
                }
            };
            Ok(SortSpec {
                field: field.clone(),
                direction,
            })
        })
        .collect()
}

fn project_stage(docs: Vec<Document>, spec: &Document) -> Vec<Document> {
    let truthy = |v: &Value| v.as_i64() == Some(1) || v.as_bool() == Some(true);

    if spec.values().any(truthy) {
        let fields: Vec<String> = spec
            .iter()
            .filter(|entry| truthy(entry.1))
            .map(|(k, _)| k.clone())
            .collect();
        docs.iter().map(|doc| project(doc, &fields)).collect()
    } else {
        docs.into_iter()
            .map(|mut doc| {
                for field in spec.keys() {
                    remove_path(&mut doc, field);
                }
                doc
            })
            .collect()
    }
}

fn vector_search(docs: Vec<Document>, spec: &Document) -> StoreResult<Vec<Document>> {
    let path = spec
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::InvalidQuery("$vectorSearch requires 'path'".into()))?;
    let query = spec
        .get("queryVector")
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::InvalidQuery("$vectorSearch requires 'queryVector'".into()))?
        .iter()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| StoreError::InvalidQuery("queryVector must be numeric".into()))
        })
        .collect::<StoreResult<Vec<f64>>>()?;
    let limit = spec
        .get("limit")
        .and_then(Value::as_u64)
        .ok_or_else(|| StoreError::InvalidQuery("$vectorSearch requires 'limit'".into()))?
        as usize;

    let mut scored: Vec<(f64, Document)> = docs
        .into_iter()
        .filter_map(|doc| {
            let candidate: Vec<f64> = get_path(&doc, path)?
                .as_array()?
                .iter()
                .map(Value::as_f64)
                .collect::<Option<_>>()?;
            let score = cosine_similarity(&query, &candidate)?;
            Some((score, doc))
        })
        .collect();

    scored.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(Ordering::Equal));

    Ok(scored
        .into_iter()
        .take(limit)
        .map(|(score, mut doc)| {
            doc.insert(SEARCH_SCORE_FIELD.to_string(), json!(score));
            doc
        })
        .collect())
}

fn cosine_similarity(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a * norm_b))
}
