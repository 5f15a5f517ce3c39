//! Submission state machine and the `state` / `last_updated` filters

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use super::super::errors::{QueryError, QueryResult};
use super::super::fragment::QueryFragment;
use super::super::operator::{IndexSpec, QueryOperator};
use super::super::params::RequestParams;
use crate::document::Document;

pub const STATE: &str = "state";
pub const LAST_UPDATED_MIN: &str = "last_updated_min";
pub const LAST_UPDATED_MAX: &str = "last_updated_max";

/// Lifecycle of a submission.
///
/// `submitted -> pending -> running -> {complete | error}`; states only move
/// forward and `complete` / `error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionState {
    Submitted,
    Pending,
    Running,
    Complete,
    Error,
}

impl SubmissionState {
    pub const ALL: [SubmissionState; 5] = [
        SubmissionState::Submitted,
        SubmissionState::Pending,
        SubmissionState::Running,
        SubmissionState::Complete,
        SubmissionState::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionState::Submitted => "submitted",
            SubmissionState::Pending => "pending",
            SubmissionState::Running => "running",
            SubmissionState::Complete => "complete",
            SubmissionState::Error => "error",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SubmissionState::Submitted => 0,
            SubmissionState::Pending => 1,
            SubmissionState::Running => 2,
            SubmissionState::Complete | SubmissionState::Error => 3,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionState::Complete | SubmissionState::Error)
    }

    /// Strictly forward moves out of a non-terminal state
    pub fn can_transition_to(&self, next: SubmissionState) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|s| s.as_str()).collect();
                format!("expected one of {}, got '{}'", names.join(", "), s)
            })
    }
}

/// Timestamp format used for `last_updated` (lexicographically ordered)
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Hex SHA-256 of the canonical JSON of the payload's key fields
pub fn submission_id(payload: &Document, key_fields: &[String]) -> QueryResult<String> {
    let mut fields: Vec<&String> = key_fields.iter().collect();
    fields.sort();
    fields.dedup();

    let mut keyed = Map::new();
    for field in fields {
        let value = payload.get(field.as_str()).ok_or_else(|| {
            QueryError::InvalidPayload(format!("missing key field '{}'", field))
        })?;
        keyed.insert(field.clone(), canonical(value));
    }

    let canonical_json = serde_json::to_string(&Value::Object(keyed))
        .map_err(|e| QueryError::InvalidPayload(e.to_string()))?;
    Ok(format!("{:x}", Sha256::digest(canonical_json.as_bytes())))
}

/// Rebuild `value` with object keys in sorted order
fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(obj) => {
            let mut keys: Vec<&String> = obj.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonical(&obj[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

/// GET-side filters for submission collections
#[derive(Debug, Clone, Default)]
pub struct SubmissionQuery;

impl SubmissionQuery {
    fn parse_time(params: &RequestParams, name: &str) -> QueryResult<Option<String>> {
        match params.get(name) {
            None => Ok(None),
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|t| Some(timestamp(t.with_timezone(&Utc))))
                .map_err(|e| QueryError::invalid(name, format!("expected an RFC 3339 timestamp: {}", e))),
        }
    }
}

impl QueryOperator for SubmissionQuery {
    fn name(&self) -> &str {
        "submission"
    }

    fn parameters(&self) -> Vec<String> {
        vec![
            STATE.to_string(),
            LAST_UPDATED_MIN.to_string(),
            LAST_UPDATED_MAX.to_string(),
        ]
    }

    fn compile(&self, params: &RequestParams) -> QueryResult<QueryFragment> {
        let mut criteria = Document::new();

        if let Some(raw) = params.get(STATE) {
            let state: SubmissionState = raw.parse().map_err(|e| QueryError::invalid(STATE, e))?;
            criteria.insert(STATE.to_string(), json!(state.as_str()));
        }

        let min = Self::parse_time(params, LAST_UPDATED_MIN)?;
        let max = Self::parse_time(params, LAST_UPDATED_MAX)?;
        if let (Some(lo), Some(hi)) = (&min, &max) {
            if lo > hi {
                return Err(QueryError::invalid(
                    LAST_UPDATED_MIN,
                    format!("is later than {}", LAST_UPDATED_MAX),
                ));
            }
        }

        let mut range = Document::new();
        if let Some(lo) = min {
            range.insert("$gte".to_string(), json!(lo));
        }
        if let Some(hi) = max {
            range.insert("$lte".to_string(), json!(hi));
        }
        if !range.is_empty() {
            criteria.insert("last_updated".to_string(), Value::Object(range));
        }

        Ok(QueryFragment::criteria(criteria))
    }

    fn ensure_indexes(&self) -> Vec<IndexSpec> {
        vec![IndexSpec::new(STATE), IndexSpec::new("last_updated")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::super::fragment::Filter;
    use crate::document::into_document;

    #[test]
    fn test_transitions() {
        use SubmissionState::*;
        assert!(Submitted.can_transition_to(Pending));
        assert!(Submitted.can_transition_to(Complete));
        assert!(Running.can_transition_to(Error));
        assert!(!Running.can_transition_to(Pending));
        assert!(!Running.can_transition_to(Running));
        assert!(!Complete.can_transition_to(Error));
        assert!(!Error.can_transition_to(Complete));
        assert!(Complete.is_terminal() && !Pending.is_terminal());
    }

    #[test]
    fn test_state_parsing() {
        assert_eq!("Running".parse::<SubmissionState>(), Ok(SubmissionState::Running));
        assert!("done".parse::<SubmissionState>().is_err());
        assert_eq!(serde_json::to_value(SubmissionState::Pending).unwrap(), json!("pending"));
    }

    #[test]
    fn test_submission_id_is_canonical() {
        let keys = vec!["structure".to_string(), "user".to_string()];
        let a = into_document(json!({
            "user": "alice",
            "structure": {"a": 1, "b": [1, 2]},
            "note": "ignored"
        }))
        .unwrap();
        let b = into_document(json!({
            "structure": {"b": [1, 2], "a": 1},
            "user": "alice"
        }))
        .unwrap();

        let id = submission_id(&a, &keys).unwrap();
        assert_eq!(id, submission_id(&b, &keys).unwrap());
        assert_eq!(id.len(), 64);

        let missing = into_document(json!({"user": "alice"})).unwrap();
        assert!(matches!(
            submission_id(&missing, &keys),
            Err(QueryError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_filters() {
        let params = RequestParams::from_pairs([
            (STATE, "complete"),
            (LAST_UPDATED_MIN, "2024-01-01T00:00:00Z"),
        ]);
        let fragment = SubmissionQuery.compile(&params).unwrap();
        let expected = into_document(json!({
            "state": "complete",
            "last_updated": {"$gte": "2024-01-01T00:00:00.000Z"}
        }))
        .unwrap();
        assert_eq!(fragment.filter, Some(Filter::Criteria(expected)));

        let bad = RequestParams::from_pairs([(STATE, "finished")]);
        assert!(SubmissionQuery.compile(&bad).is_err());
    }
}
