//! Planner hints
//!
//! A `HintScheme` maps a composed query onto index hints for `find` and
//! `count`. Rule-based schemes evaluate their rules in order and the first
//! match wins, so the same query always yields the same hint.

use serde_json::{json, Value};

use super::fragment::ComposedQuery;
use crate::document::{into_document, Document};

/// Hints for one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hints {
    pub hint: Option<Document>,
    pub count_hint: Option<Document>,
}

/// Maps composed queries onto planner hints
pub trait HintScheme: Send + Sync {
    fn generate_hints(&self, query: &ComposedQuery) -> Hints;
}

/// When a hint rule applies
#[derive(Debug, Clone, PartialEq)]
pub enum HintCondition {
    /// Criteria reference exactly this field
    HasField(String),
    /// Criteria reference a field starting with this prefix
    HasFieldPrefix(String),
    /// Criteria are empty
    EmptyCriteria,
    Always,
}

impl HintCondition {
    fn matches(&self, criteria: &Document) -> bool {
        match self {
            HintCondition::HasField(field) => {
                criteria_fields(criteria).iter().any(|f| f == field)
            }
            HintCondition::HasFieldPrefix(prefix) => criteria_fields(criteria)
                .iter()
                .any(|f| f.starts_with(prefix.as_str())),
            HintCondition::EmptyCriteria => criteria.is_empty(),
            HintCondition::Always => true,
        }
    }
}

/// One `(condition, hint)` rule
#[derive(Debug, Clone, PartialEq)]
pub struct HintRule {
    pub condition: HintCondition,
    pub hint: Document,
    /// Defaults to `hint` when unset
    pub count_hint: Option<Document>,
}

impl HintRule {
    pub fn new(condition: HintCondition, hint: Document) -> Self {
        Self {
            condition,
            hint,
            count_hint: None,
        }
    }

    pub fn with_count_hint(mut self, count_hint: Document) -> Self {
        self.count_hint = Some(count_hint);
        self
    }
}

/// Ordered rules; first match wins, no match means no hint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleHintScheme {
    rules: Vec<HintRule>,
}

impl RuleHintScheme {
    pub fn new(rules: Vec<HintRule>) -> Self {
        Self { rules }
    }

    pub fn rule(mut self, rule: HintRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Hints for the core materials collection
    pub fn materials() -> Self {
        Self::new(vec![
            HintRule::new(
                HintCondition::HasField("nelements".to_string()),
                hint_doc(json!({"nelements": 1})),
            ),
            HintRule::new(
                HintCondition::HasFieldPrefix("composition_reduced.".to_string()),
                hint_doc(json!({"composition_reduced.$**": 1})),
            ),
            HintRule::new(
                HintCondition::HasField("formula_pretty".to_string()),
                hint_doc(json!({"formula_pretty": 1})),
            ),
            HintRule::new(
                HintCondition::Always,
                hint_doc(json!({"deprecated": 1, "builder_meta.license": 1})),
            ),
        ])
    }
}

impl HintScheme for RuleHintScheme {
    fn generate_hints(&self, query: &ComposedQuery) -> Hints {
        self.rules
            .iter()
            .find(|rule| rule.condition.matches(&query.criteria))
            .map(|rule| Hints {
                hint: Some(rule.hint.clone()),
                count_hint: Some(rule.count_hint.clone().unwrap_or_else(|| rule.hint.clone())),
            })
            .unwrap_or_default()
    }
}

fn hint_doc(value: Value) -> Document {
    into_document(value).unwrap_or_default()
}

/// Field names referenced by criteria, including inside `$and` / `$or`
fn criteria_fields(criteria: &Document) -> Vec<String> {
    let mut fields = Vec::new();
    collect_fields(criteria, &mut fields);
    fields
}

fn collect_fields(criteria: &Document, fields: &mut Vec<String>) {
    for (key, value) in criteria {
        if key == "$and" || key == "$or" {
            for clause in value.as_array().into_iter().flatten() {
                if let Some(clause) = clause.as_object() {
                    collect_fields(clause, fields);
                }
            }
        } else if !key.starts_with('$') {
            fields.push(key.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(criteria: Value) -> ComposedQuery {
        ComposedQuery {
            criteria: into_document(criteria).unwrap(),
            ..ComposedQuery::default()
        }
    }

    #[test]
    fn test_materials_rules_in_order() {
        let scheme = RuleHintScheme::materials();

        let hints = scheme.generate_hints(&query(json!({
            "composition_reduced.Cr": 2.0,
            "nelements": 2
        })));
        assert_eq!(hints.hint, Some(hint_doc(json!({"nelements": 1}))));
        assert_eq!(hints.count_hint, hints.hint);

        let hints = scheme.generate_hints(&query(json!({"composition_reduced.Cr": 2.0})));
        assert_eq!(hints.hint, Some(hint_doc(json!({"composition_reduced.$**": 1}))));

        let hints = scheme.generate_hints(&query(json!({"formula_pretty": {"$in": ["SiO2"]}})));
        assert_eq!(hints.hint, Some(hint_doc(json!({"formula_pretty": 1}))));

        let hints = scheme.generate_hints(&query(json!({})));
        assert_eq!(
            hints.hint,
            Some(hint_doc(json!({"deprecated": 1, "builder_meta.license": 1})))
        );
    }

    #[test]
    fn test_fields_inside_logical_operators() {
        let scheme = RuleHintScheme::materials();
        let hints = scheme.generate_hints(&query(json!({
            "$or": [{"formula_anonymous": "A2B3"}, {"nelements": 3}]
        })));
        assert_eq!(hints.hint, Some(hint_doc(json!({"nelements": 1}))));
    }

    #[test]
    fn test_no_rule_no_hint() {
        let scheme = RuleHintScheme::default().rule(HintRule::new(
            HintCondition::EmptyCriteria,
            hint_doc(json!({"_id": 1})),
        ));
        assert_eq!(scheme.generate_hints(&query(json!({"a": 1}))), Hints::default());
        assert!(scheme.generate_hints(&query(json!({}))).hint.is_some());
    }
}
