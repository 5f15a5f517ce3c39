//! Schema error types

use std::fmt;

use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Validation failure details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetails {
    /// Field path (e.g., "symmetry.crystal_system")
    pub field: String,
    /// Expected type or condition
    pub expected: String,
    /// Actual value or type found
    pub actual: String,
}

impl ValidationDetails {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(field, "field to be present", "missing")
    }

    pub fn extra_field(field: impl Into<String>) -> Self {
        Self::new(field, "no undeclared fields", "extra field present")
    }

    pub fn type_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::new(field, expected, actual)
    }

    pub fn null_value(field: impl Into<String>) -> Self {
        Self::new(field, "non-null value", "null")
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}': expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

/// Schema errors
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    /// Document violates the schema
    #[error("Document validation failed for '{schema}': {details}")]
    ValidationFailed {
        schema: String,
        details: ValidationDetails,
    },

    /// Schema file is unreadable or malformed
    #[error("Invalid schema definition: {0}")]
    InvalidDefinition(String),
}

impl SchemaError {
    pub fn validation_failed(schema: impl Into<String>, details: ValidationDetails) -> Self {
        SchemaError::ValidationFailed {
            schema: schema.into(),
            details,
        }
    }

    /// Details of a validation failure
    pub fn details(&self) -> Option<&ValidationDetails> {
        match self {
            SchemaError::ValidationFailed { details, .. } => Some(details),
            SchemaError::InvalidDefinition(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_names_field() {
        let err = SchemaError::validation_failed(
            "materials",
            ValidationDetails::type_mismatch("nsites", "int", "string"),
        );
        assert_eq!(
            err.to_string(),
            "Document validation failed for 'materials': field 'nsites': expected int, got string"
        );
        assert_eq!(err.details().map(|d| d.field.as_str()), Some("nsites"));
    }
}
