//! Request parameter access
//!
//! Typed accessors over the raw query string map. Empty values are treated
//! as absent.

use std::collections::HashMap;
use std::str::FromStr;

use super::errors::{QueryError, QueryResult};

/// Query string parameters of one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    values: HashMap<String, String>,
}

impl RequestParams {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Names of all supplied parameters
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Raw trimmed value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Parse a value with `FromStr`, naming the parameter on failure
    pub fn parse<T: FromStr>(&self, name: &str, expected: &str) -> QueryResult<Option<T>> {
        match self.get(name) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|_| QueryError::invalid(name, format!("expected {}, got '{}'", expected, raw))),
        }
    }

    pub fn get_u64(&self, name: &str) -> QueryResult<Option<u64>> {
        self.parse(name, "a non-negative integer")
    }

    pub fn get_f64(&self, name: &str) -> QueryResult<Option<f64>> {
        match self.parse::<f64>(name, "a number")? {
            Some(v) if !v.is_finite() => Err(QueryError::invalid(name, "must be finite")),
            other => Ok(other),
        }
    }

    pub fn get_bool(&self, name: &str) -> QueryResult<Option<bool>> {
        match self.get(name) {
            None => Ok(None),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Some(true)),
                "false" | "0" | "no" => Ok(Some(false)),
                _ => Err(QueryError::invalid(name, format!("expected a boolean, got '{}'", raw))),
            },
        }
    }

    /// Comma-separated list, entries trimmed, empties skipped
    pub fn get_list(&self, name: &str) -> Option<Vec<String>> {
        self.get(name).map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
    }
}

impl From<HashMap<String, String>> for RequestParams {
    fn from(values: HashMap<String, String>) -> Self {
        Self::new(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let params = RequestParams::from_pairs([
            ("_limit", "10"),
            ("band_gap_min", "1.5"),
            ("_all_fields", "TRUE"),
            ("_fields", "a, b,,c"),
            ("empty", "  "),
        ]);
        assert_eq!(params.get_u64("_limit").unwrap(), Some(10));
        assert_eq!(params.get_f64("band_gap_min").unwrap(), Some(1.5));
        assert_eq!(params.get_bool("_all_fields").unwrap(), Some(true));
        assert_eq!(
            params.get_list("_fields").unwrap(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert_eq!(params.get("empty"), None);
        assert_eq!(params.get_u64("missing").unwrap(), None);
    }

    #[test]
    fn test_parse_errors_name_parameter() {
        let params = RequestParams::from_pairs([("_skip", "-1"), ("x_min", "NaN")]);
        let err = params.get_u64("_skip").unwrap_err();
        assert!(err.to_string().contains("_skip"));
        assert!(params.get_f64("x_min").is_err());
    }
}
