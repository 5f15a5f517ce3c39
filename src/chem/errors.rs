//! # Criteria Compiler Errors

use thiserror::Error;

/// Result type for formula and chemical system parsing
pub type ChemResult<T> = Result<T, ChemError>;

/// Formula / chemsys input errors. All of them are client errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChemError {
    #[error("Empty entry in '{0}'")]
    EmptyEntry(String),

    #[error("Unknown element symbol '{symbol}' in '{input}'")]
    UnknownElement { symbol: String, input: String },

    #[error("Malformed formula '{input}': {reason}")]
    MalformedFormula { input: String, reason: String },

    #[error("Malformed chemical system '{input}': {reason}")]
    MalformedChemsys { input: String, reason: String },

    #[error("Formula '{0}' contains more than one wildcard; only a single '*' is supported")]
    MultipleWildcards(String),

    #[error("Wildcard formulas are only supported for single-formula queries: '{0}'")]
    WildcardInList(String),
}

impl ChemError {
    pub(crate) fn malformed_formula(input: &str, reason: impl Into<String>) -> Self {
        ChemError::MalformedFormula {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_chemsys(input: &str, reason: impl Into<String>) -> Self {
        ChemError::MalformedChemsys {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unknown_element(symbol: &str, input: &str) -> Self {
        ChemError::UnknownElement {
            symbol: symbol.to_string(),
            input: input.to_string(),
        }
    }
}
