//! Numeric range filters (`<param>_min` / `<param>_max`)

use serde_json::{json, Value};

use super::super::errors::{QueryError, QueryResult};
use super::super::fragment::QueryFragment;
use super::super::operator::{IndexSpec, QueryOperator};
use super::super::params::RequestParams;
use crate::document::Document;

#[derive(Debug, Clone, PartialEq)]
struct RangeField {
    param: String,
    field: String,
}

/// Inclusive ranges over numeric fields
#[derive(Debug, Clone, Default)]
pub struct NumericQuery {
    fields: Vec<RangeField>,
}

impl NumericQuery {
    /// One range filter per field, parameter prefix equal to the field
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut query = Self::default();
        for field in fields {
            let field = field.into();
            query = query.with_alias(field.clone(), field);
        }
        query
    }

    /// Filter `field` through parameters prefixed with `param`
    pub fn with_alias(mut self, param: impl Into<String>, field: impl Into<String>) -> Self {
        self.fields.push(RangeField {
            param: param.into(),
            field: field.into(),
        });
        self
    }
}

impl QueryOperator for NumericQuery {
    fn name(&self) -> &str {
        "numeric"
    }

    fn parameters(&self) -> Vec<String> {
        self.fields
            .iter()
            .flat_map(|f| [format!("{}_min", f.param), format!("{}_max", f.param)])
            .collect()
    }

    fn compile(&self, params: &RequestParams) -> QueryResult<QueryFragment> {
        let mut criteria = Document::new();

        for range in &self.fields {
            let min_param = format!("{}_min", range.param);
            let max_param = format!("{}_max", range.param);
            let min = params.get_f64(&min_param)?;
            let max = params.get_f64(&max_param)?;

            if let (Some(lo), Some(hi)) = (min, max) {
                if lo > hi {
                    return Err(QueryError::invalid(
                        min_param,
                        format!("{} is greater than {} ({})", lo, max_param, hi),
                    ));
                }
            }

            let mut condition = Document::new();
            if let Some(lo) = min {
                condition.insert("$gte".to_string(), json!(lo));
            }
            if let Some(hi) = max {
                condition.insert("$lte".to_string(), json!(hi));
            }
            if !condition.is_empty() {
                criteria.insert(range.field.clone(), Value::Object(condition));
            }
        }

        Ok(QueryFragment::criteria(criteria))
    }

    fn ensure_indexes(&self) -> Vec<IndexSpec> {
        self.fields.iter().map(|f| IndexSpec::new(f.field.as_str())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::super::fragment::Filter;

    #[test]
    fn test_ranges() {
        let op = NumericQuery::new(["band_gap", "density"]).with_alias("nsites", "structure.nsites");
        let params = RequestParams::from_pairs([
            ("band_gap_min", "0.5"),
            ("band_gap_max", "2"),
            ("nsites_max", "10"),
        ]);
        let fragment = op.compile(&params).unwrap();
        assert_eq!(
            fragment.filter,
            Some(Filter::Criteria(
                crate::document::into_document(json!({
                    "band_gap": {"$gte": 0.5, "$lte": 2.0},
                    "structure.nsites": {"$lte": 10.0}
                }))
                .unwrap()
            ))
        );
        assert!(op.parameters().contains(&"density_min".to_string()));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let op = NumericQuery::new(["band_gap"]);
        let params = RequestParams::from_pairs([("band_gap_min", "3"), ("band_gap_max", "1")]);
        let err = op.compile(&params).unwrap_err();
        assert!(err.to_string().contains("band_gap_min"));
    }
}
