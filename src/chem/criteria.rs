//! Formula and chemical-system criteria
//!
//! Input is a comma-separated list. Each entry is classified on its own:
//!
//! - concrete: every symbol is an element (`Cr2O3`, `O-Si`)
//! - wildcard: contains `*` alongside elements (`Cr2*3`, `Si-*`)
//! - anonymous: placeholders only (`A2B3`, `*-*-*`)
//!
//! Lists whose entries share the concrete or anonymous shape collapse into a
//! single `$in`; mixed lists become an `$or` of per-entry criteria.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use super::composition::{
    anonymized_formula, reduce_amounts, reduced_formula, tokenize, Symbol, MAX_COMPONENTS,
};
use super::element::is_element;
use super::errors::{ChemError, ChemResult};
use crate::document::Document;

/// A classified formula entry
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaEntry {
    Concrete {
        reduced: BTreeMap<String, f64>,
        pretty: String,
    },
    Wildcard {
        reduced: BTreeMap<String, f64>,
        anonymous: String,
    },
    Anonymous(String),
}

impl FormulaEntry {
    /// Parse and classify one formula
    pub fn parse(input: &str) -> ChemResult<Self> {
        let tokens = tokenize(input)?;

        let wildcards = tokens
            .iter()
            .filter(|t| t.symbol == Symbol::Wildcard)
            .count();
        if wildcards > 1 {
            return Err(ChemError::MultipleWildcards(input.to_string()));
        }

        let mut named: BTreeMap<String, f64> = BTreeMap::new();
        let mut wildcard_amount = None;
        for token in &tokens {
            match &token.symbol {
                Symbol::Named(symbol) => *named.entry(symbol.clone()).or_insert(0.0) += token.amount,
                Symbol::Wildcard => wildcard_amount = Some(token.amount),
            }
        }

        if named.len() + wildcards > MAX_COMPONENTS {
            return Err(ChemError::malformed_formula(input, "too many components"));
        }

        if let Some(wildcard_amount) = wildcard_amount {
            if let Some(bad) = named.keys().find(|s| !is_element(s)) {
                return Err(ChemError::unknown_element(bad, input));
            }
            let mut amounts: Vec<f64> = named.values().copied().collect();
            amounts.push(wildcard_amount);
            let reduced_amounts = reduce_amounts(&amounts, input)?;
            let reduced = named
                .keys()
                .cloned()
                .zip(reduced_amounts.iter().copied())
                .collect();
            return Ok(FormulaEntry::Wildcard {
                reduced,
                anonymous: anonymized_formula(&reduced_amounts),
            });
        }

        if named.keys().all(|s| is_element(s)) {
            let amounts: Vec<f64> = named.values().copied().collect();
            let reduced: BTreeMap<String, f64> = named
                .keys()
                .cloned()
                .zip(reduce_amounts(&amounts, input)?)
                .collect();
            let pretty = reduced_formula(&reduced);
            return Ok(FormulaEntry::Concrete { reduced, pretty });
        }

        if named.keys().all(|s| s.len() == 1) {
            let amounts: Vec<f64> = named.values().copied().collect();
            let reduced = reduce_amounts(&amounts, input)?;
            return Ok(FormulaEntry::Anonymous(anonymized_formula(&reduced)));
        }

        // Only reachable with a multi-letter symbol that is not an element
        match named.keys().find(|s| !is_element(s)) {
            Some(bad) => Err(ChemError::unknown_element(bad, input)),
            None => Err(ChemError::malformed_formula(input, "unrecognised formula")),
        }
    }

    /// Criteria matching this entry alone
    pub fn criteria(&self) -> Document {
        let mut crit = Document::new();
        match self {
            FormulaEntry::Concrete { reduced, .. } => {
                for (element, amount) in reduced {
                    crit.insert(format!("composition_reduced.{}", element), json!(amount));
                }
                crit.insert("nelements".to_string(), json!(reduced.len()));
            }
            FormulaEntry::Wildcard { reduced, anonymous } => {
                for (element, amount) in reduced {
                    crit.insert(format!("composition_reduced.{}", element), json!(amount));
                }
                crit.insert("formula_anonymous".to_string(), json!(anonymous));
            }
            FormulaEntry::Anonymous(anonymous) => {
                crit.insert("formula_anonymous".to_string(), json!(anonymous));
            }
        }
        crit
    }
}

/// A classified chemical-system entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChemsysEntry {
    Concrete(String),
    Wildcard { elements: Vec<String>, nelements: usize },
    Anonymous(usize),
}

impl ChemsysEntry {
    /// Parse and classify one dash-separated chemical system
    pub fn parse(input: &str) -> ChemResult<Self> {
        let mut elements = Vec::new();
        let mut wildcards = 0;

        for slot in input.split('-').map(str::trim) {
            match slot {
                "" => return Err(ChemError::malformed_chemsys(input, "empty slot")),
                "*" => wildcards += 1,
                symbol if is_element(symbol) => elements.push(symbol.to_string()),
                symbol => return Err(ChemError::unknown_element(symbol, input)),
            }
        }

        // Every slot counts toward nelements, repeated symbols included
        let slots = elements.len() + wildcards;
        elements.sort();
        elements.dedup();

        Ok(match (elements.is_empty(), wildcards) {
            (true, n) => ChemsysEntry::Anonymous(n),
            (false, 0) => ChemsysEntry::Concrete(elements.join("-")),
            (false, _) => ChemsysEntry::Wildcard {
                nelements: slots,
                elements,
            },
        })
    }

    /// Criteria matching this entry alone
    pub fn criteria(&self) -> Document {
        let mut crit = Document::new();
        match self {
            ChemsysEntry::Concrete(chemsys) => {
                crit.insert("chemsys".to_string(), json!(chemsys));
            }
            ChemsysEntry::Wildcard {
                elements,
                nelements,
            } => {
                crit.insert("elements".to_string(), json!({ "$all": elements }));
                crit.insert("nelements".to_string(), json!(nelements));
            }
            ChemsysEntry::Anonymous(nelements) => {
                crit.insert("nelements".to_string(), json!(nelements));
            }
        }
        crit
    }
}

fn split_entries(input: &str) -> ChemResult<Vec<&str>> {
    let entries: Vec<&str> = input.split(',').map(str::trim).collect();
    if entries.iter().any(|e| e.is_empty()) {
        return Err(ChemError::EmptyEntry(input.to_string()));
    }
    Ok(entries)
}

fn unique_in(values: Vec<Value>) -> Value {
    let mut unique: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    json!({ "$in": unique })
}

fn or_of(criteria: Vec<Document>) -> Document {
    let mut crit = Document::new();
    crit.insert(
        "$or".to_string(),
        Value::Array(criteria.into_iter().map(Value::Object).collect()),
    );
    crit
}

/// Compile a comma-separated list of formulas into criteria
pub fn formula_to_criteria(formulas: &str) -> ChemResult<Document> {
    let raw = split_entries(formulas)?;
    let entries = raw
        .iter()
        .map(|f| FormulaEntry::parse(f))
        .collect::<ChemResult<Vec<_>>>()?;

    if entries.len() == 1 {
        return Ok(entries[0].criteria());
    }

    if entries
        .iter()
        .any(|e| matches!(e, FormulaEntry::Wildcard { .. }))
    {
        return Err(ChemError::WildcardInList(formulas.to_string()));
    }

    let mut crit = Document::new();
    if entries
        .iter()
        .all(|e| matches!(e, FormulaEntry::Concrete { .. }))
    {
        let pretty = entries
            .iter()
            .filter_map(|e| match e {
                FormulaEntry::Concrete { pretty, .. } => Some(json!(pretty)),
                _ => None,
            })
            .collect();
        crit.insert("formula_pretty".to_string(), unique_in(pretty));
        return Ok(crit);
    }

    if entries
        .iter()
        .all(|e| matches!(e, FormulaEntry::Anonymous(_)))
    {
        let anonymous = entries
            .iter()
            .filter_map(|e| match e {
                FormulaEntry::Anonymous(anon) => Some(json!(anon)),
                _ => None,
            })
            .collect();
        crit.insert("formula_anonymous".to_string(), unique_in(anonymous));
        return Ok(crit);
    }

    Ok(or_of(entries.iter().map(FormulaEntry::criteria).collect()))
}

/// Compile a comma-separated list of chemical systems into criteria
pub fn chemsys_to_criteria(chemsys: &str) -> ChemResult<Document> {
    let raw = split_entries(chemsys)?;
    let entries = raw
        .iter()
        .map(|c| ChemsysEntry::parse(c))
        .collect::<ChemResult<Vec<_>>>()?;

    if entries.len() == 1 {
        return Ok(entries[0].criteria());
    }

    let mut crit = Document::new();
    if entries.iter().all(|e| matches!(e, ChemsysEntry::Concrete(_))) {
        let systems = entries
            .iter()
            .filter_map(|e| match e {
                ChemsysEntry::Concrete(s) => Some(json!(s)),
                _ => None,
            })
            .collect();
        crit.insert("chemsys".to_string(), unique_in(systems));
        return Ok(crit);
    }

    if entries.iter().all(|e| matches!(e, ChemsysEntry::Anonymous(_))) {
        let counts = entries
            .iter()
            .filter_map(|e| match e {
                ChemsysEntry::Anonymous(n) => Some(json!(n)),
                _ => None,
            })
            .collect();
        crit.insert("nelements".to_string(), unique_in(counts));
        return Ok(crit);
    }

    Ok(or_of(entries.iter().map(ChemsysEntry::criteria).collect()))
}

/// Parse a comma-separated element list (`Fe,O`), validating every symbol
pub fn parse_elements(input: &str) -> ChemResult<Vec<String>> {
    let mut elements = Vec::new();
    for symbol in split_entries(input)? {
        if !is_element(symbol) {
            return Err(ChemError::unknown_element(symbol, input));
        }
        if !elements.iter().any(|e: &String| e == symbol) {
            elements.push(symbol.to_string());
        }
    }
    Ok(elements)
}
