//! Criteria evaluation
//!
//! Evaluates Mongo-style criteria against in-memory documents. Supported:
//! implicit equality, `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`,
//! `$nin`, `$all`, `$exists`, `$regex` (with `$options`), `$and`, `$or`.
//!
//! [`CompiledCriteria`] compiles every `$regex` once, so a scan over many
//! documents does not rebuild patterns per document.

use std::cmp::Ordering;
use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use serde_json::Value;

use super::collection::{SortDirection, SortSpec};
use super::errors::{StoreError, StoreResult};
use crate::document::{get_path, Document};

/// `(pattern, case_insensitive, multi_line)`
type RegexKey = (String, bool, bool);

/// Criteria with their `$regex` patterns compiled
#[derive(Debug)]
pub struct CompiledCriteria<'a> {
    criteria: &'a Document,
    regexes: HashMap<RegexKey, Regex>,
}

impl<'a> CompiledCriteria<'a> {
    pub fn new(criteria: &'a Document) -> StoreResult<Self> {
        let mut regexes = HashMap::new();
        collect_regexes(criteria, &mut regexes)?;
        Ok(Self { criteria, regexes })
    }

    /// Returns true if `doc` satisfies every clause
    pub fn matches(&self, doc: &Document) -> StoreResult<bool> {
        self.matches_clause(doc, self.criteria)
    }

    fn matches_clause(&self, doc: &Document, criteria: &Document) -> StoreResult<bool> {
        for (key, condition) in criteria {
            let ok = match key.as_str() {
                "$and" => {
                    let mut all = true;
                    for clause in clause_list(key, condition)? {
                        if !self.matches_clause(doc, clause)? {
                            all = false;
                            break;
                        }
                    }
                    all
                }
                "$or" => {
                    let mut any = false;
                    for clause in clause_list(key, condition)? {
                        if self.matches_clause(doc, clause)? {
                            any = true;
                            break;
                        }
                    }
                    any
                }
                op if op.starts_with('$') => {
                    return Err(StoreError::UnsupportedOperator(op.to_string()));
                }
                field => self.matches_field(get_path(doc, field), condition)?,
            };

            if !ok {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn matches_field(&self, field_value: Option<&Value>, condition: &Value) -> StoreResult<bool> {
        let ops = match condition.as_object() {
            Some(ops) if is_operator_doc(condition) => ops,
            _ => return Ok(equals(field_value, condition)),
        };
        let options = ops.get("$options").and_then(Value::as_str).unwrap_or("");

        for (op, operand) in ops {
            let ok = match op.as_str() {
                "$regex" => {
                    let key = regex_key(operand, options)?;
                    match self.regexes.get(&key) {
                        Some(regex) => regex_match(field_value, regex),
                        None => regex_match(field_value, &build_regex(&key)?),
                    }
                }
                _ => match_operator(field_value, op, operand)?,
            };

            if !ok {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Returns true if `doc` satisfies every clause of `criteria`
pub fn matches(doc: &Document, criteria: &Document) -> StoreResult<bool> {
    CompiledCriteria::new(criteria)?.matches(doc)
}

fn collect_regexes(criteria: &Document, regexes: &mut HashMap<RegexKey, Regex>) -> StoreResult<()> {
    for (key, condition) in criteria {
        match key.as_str() {
            "$and" | "$or" => {
                for clause in clause_list(key, condition)? {
                    collect_regexes(clause, regexes)?;
                }
            }
            _ => {
                let Some(ops) = condition.as_object() else {
                    continue;
                };
                if let Some(pattern) = ops.get("$regex") {
                    let options = ops.get("$options").and_then(Value::as_str).unwrap_or("");
                    let key = regex_key(pattern, options)?;
                    if !regexes.contains_key(&key) {
                        let regex = build_regex(&key)?;
                        regexes.insert(key, regex);
                    }
                }
            }
        }
    }
    Ok(())
}

fn regex_key(pattern: &Value, options: &str) -> StoreResult<RegexKey> {
    let pattern = pattern
        .as_str()
        .ok_or_else(|| StoreError::InvalidQuery("$regex expects a string".to_string()))?;
    Ok((pattern.to_string(), options.contains('i'), options.contains('m')))
}

fn build_regex((pattern, case_insensitive, multi_line): &RegexKey) -> StoreResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(*case_insensitive)
        .multi_line(*multi_line)
        .build()
        .map_err(|e| StoreError::InvalidQuery(format!("invalid $regex: {}", e)))
}

fn clause_list<'a>(key: &str, condition: &'a Value) -> StoreResult<Vec<&'a Document>> {
    let items = condition
        .as_array()
        .ok_or_else(|| StoreError::InvalidQuery(format!("{} expects an array", key)))?;
    items
        .iter()
        .map(|item| {
            item.as_object()
                .ok_or_else(|| StoreError::InvalidQuery(format!("{} clauses must be objects", key)))
        })
        .collect()
}

/// An operator document has only `$`-prefixed keys
pub fn is_operator_doc(value: &Value) -> bool {
    match value {
        Value::Object(obj) => !obj.is_empty() && obj.keys().all(|k| k.starts_with('$')),
        _ => false,
    }
}

fn match_operator(field_value: Option<&Value>, op: &str, operand: &Value) -> StoreResult<bool> {
    Ok(match op {
        "$eq" => equals(field_value, operand),
        "$ne" => !equals(field_value, operand),
        "$gt" => compare_op(field_value, operand, |o| o == Ordering::Greater),
        "$gte" => compare_op(field_value, operand, |o| o != Ordering::Less),
        "$lt" => compare_op(field_value, operand, |o| o == Ordering::Less),
        "$lte" => compare_op(field_value, operand, |o| o != Ordering::Greater),
        "$in" => operand_array(op, operand)?
            .iter()
            .any(|candidate| equals(field_value, candidate)),
        "$nin" => !operand_array(op, operand)?
            .iter()
            .any(|candidate| equals(field_value, candidate)),
        "$all" => match field_value.and_then(Value::as_array) {
            Some(items) => operand_array(op, operand)?
                .iter()
                .all(|required| items.contains(required)),
            None => false,
        },
        "$exists" => field_value.is_some() == operand.as_bool().unwrap_or(true),
        "$options" => true,
        other => return Err(StoreError::UnsupportedOperator(other.to_string())),
    })
}

fn operand_array<'a>(op: &str, operand: &'a Value) -> StoreResult<&'a Vec<Value>> {
    operand
        .as_array()
        .ok_or_else(|| StoreError::InvalidQuery(format!("{} expects an array", op)))
}

/// Equality with array-membership semantics and numeric normalisation
fn equals(field_value: Option<&Value>, expected: &Value) -> bool {
    match field_value {
        None => expected.is_null(),
        Some(actual) => {
            if values_equal(actual, expected) {
                return true;
            }
            match (actual, expected) {
                (Value::Array(items), e) if !e.is_array() => {
                    items.iter().any(|item| values_equal(item, e))
                }
                _ => false,
            }
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare_op(
    field_value: Option<&Value>,
    operand: &Value,
    accept: impl Fn(Ordering) -> bool,
) -> bool {
    match field_value.and_then(|v| compare_scalars(v, operand)) {
        Some(ordering) => accept(ordering),
        None => false,
    }
}

fn compare_scalars(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn regex_match(field_value: Option<&Value>, regex: &Regex) -> bool {
    match field_value {
        Some(Value::String(s)) => regex.is_match(s),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .any(|s| regex.is_match(s)),
        _ => false,
    }
}

/// Compares two optional values for sorting.
///
/// Missing < null < bool < number < string; arrays and objects compare equal.
pub fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => {
            let by_type = rank(x).cmp(&rank(y));
            if by_type != Ordering::Equal {
                return by_type;
            }
            match (x, y) {
                (Value::Bool(p), Value::Bool(q)) => p.cmp(q),
                _ => compare_scalars(x, y).unwrap_or(Ordering::Equal),
            }
        }
    }
}

/// Stable multi-key sort
pub fn sort_documents(docs: &mut [Document], sort: &[SortSpec]) {
    if sort.is_empty() {
        return;
    }

    docs.sort_by(|a, b| {
        for spec in sort {
            let ordering = compare_for_sort(get_path(a, &spec.field), get_path(b, &spec.field));
            let ordering = match spec.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}
