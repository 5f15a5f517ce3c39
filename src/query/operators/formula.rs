//! Composition filters: `formula`, `chemsys`, `elements`

use serde_json::{json, Value};

use super::super::errors::{QueryError, QueryResult};
use super::super::fragment::QueryFragment;
use super::super::operator::{IndexSpec, QueryOperator};
use super::super::params::RequestParams;
use crate::chem::{chemsys_to_criteria, formula_to_criteria, parse_elements};
use crate::document::Document;

pub const FORMULA: &str = "formula";
pub const CHEMSYS: &str = "chemsys";
pub const ELEMENTS: &str = "elements";
pub const EXCLUDE_ELEMENTS: &str = "exclude_elements";

/// Filter by concrete, wildcard or anonymous formulas
#[derive(Debug, Clone, Default)]
pub struct FormulaQuery;

impl QueryOperator for FormulaQuery {
    fn name(&self) -> &str {
        "formula"
    }

    fn parameters(&self) -> Vec<String> {
        vec![FORMULA.to_string()]
    }

    fn compile(&self, params: &RequestParams) -> QueryResult<QueryFragment> {
        match params.get(FORMULA) {
            Some(formulas) => Ok(QueryFragment::criteria(formula_to_criteria(formulas)?)),
            None => Ok(QueryFragment::empty()),
        }
    }

    fn ensure_indexes(&self) -> Vec<IndexSpec> {
        vec![
            IndexSpec::new("formula_pretty"),
            IndexSpec::new("formula_anonymous"),
            IndexSpec::new("nelements"),
            IndexSpec::new("composition_reduced.$**"),
        ]
    }
}

/// Filter by chemical systems (`Li-Fe-O`, `Si-*`, `*-*`)
#[derive(Debug, Clone, Default)]
pub struct ChemsysQuery;

impl QueryOperator for ChemsysQuery {
    fn name(&self) -> &str {
        "chemsys"
    }

    fn parameters(&self) -> Vec<String> {
        vec![CHEMSYS.to_string()]
    }

    fn compile(&self, params: &RequestParams) -> QueryResult<QueryFragment> {
        match params.get(CHEMSYS) {
            Some(systems) => Ok(QueryFragment::criteria(chemsys_to_criteria(systems)?)),
            None => Ok(QueryFragment::empty()),
        }
    }

    fn ensure_indexes(&self) -> Vec<IndexSpec> {
        vec![
            IndexSpec::new("chemsys"),
            IndexSpec::new("elements"),
            IndexSpec::new("nelements"),
        ]
    }
}

/// Require or exclude element symbols
#[derive(Debug, Clone, Default)]
pub struct ElementsQuery;

impl QueryOperator for ElementsQuery {
    fn name(&self) -> &str {
        "elements"
    }

    fn parameters(&self) -> Vec<String> {
        vec![ELEMENTS.to_string(), EXCLUDE_ELEMENTS.to_string()]
    }

    fn compile(&self, params: &RequestParams) -> QueryResult<QueryFragment> {
        let include = params.get(ELEMENTS).map(parse_elements).transpose()?;
        let exclude = params.get(EXCLUDE_ELEMENTS).map(parse_elements).transpose()?;

        if let (Some(include), Some(exclude)) = (&include, &exclude) {
            if let Some(both) = include.iter().find(|e| exclude.contains(*e)) {
                return Err(QueryError::AmbiguousParameters(format!(
                    "'{}' is both required and excluded",
                    both
                )));
            }
        }

        let mut condition = Document::new();
        if let Some(include) = include {
            condition.insert("$all".to_string(), json!(include));
        }
        if let Some(exclude) = exclude {
            condition.insert("$nin".to_string(), json!(exclude));
        }

        let mut criteria = Document::new();
        if !condition.is_empty() {
            criteria.insert("elements".to_string(), Value::Object(condition));
        }
        Ok(QueryFragment::criteria(criteria))
    }

    fn ensure_indexes(&self) -> Vec<IndexSpec> {
        vec![IndexSpec::new("elements")]
    }
}
