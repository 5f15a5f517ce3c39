//! Document validation
//!
//! Full validation checks required fields, declared fields and types.
//! Partial validation is used for projected documents: missing fields are
//! fine, but whatever is present must match.

use serde_json::{Map, Value};

use super::errors::{SchemaError, SchemaResult, ValidationDetails};
use super::types::{DocumentSchema, FieldDef, FieldType};
use crate::document::Document;

/// Validates documents against one schema. Does not mutate documents.
pub struct SchemaValidator<'a> {
    schema: &'a DocumentSchema,
    partial: bool,
}

impl<'a> SchemaValidator<'a> {
    /// Validator requiring every required field
    pub fn full(schema: &'a DocumentSchema) -> Self {
        Self {
            schema,
            partial: false,
        }
    }

    /// Validator tolerating missing fields
    pub fn partial(schema: &'a DocumentSchema) -> Self {
        Self {
            schema,
            partial: true,
        }
    }

    pub fn validate(&self, document: &Document) -> SchemaResult<()> {
        if !self.schema.allow_extra {
            for key in document.keys() {
                if !self.schema.fields.contains_key(key) {
                    return Err(self.fail(ValidationDetails::extra_field(key.as_str())));
                }
            }
        }

        for (name, def) in &self.schema.fields {
            self.validate_field(document.get(name), def, name)?;
        }
        Ok(())
    }

    fn validate_field(&self, value: Option<&Value>, def: &FieldDef, path: &str) -> SchemaResult<()> {
        match value {
            None if def.required && !self.partial => {
                Err(self.fail(ValidationDetails::missing_field(path)))
            }
            None => Ok(()),
            Some(Value::Null) if def.nullable => Ok(()),
            Some(Value::Null) => Err(self.fail(ValidationDetails::null_value(path))),
            Some(value) => self.validate_value(value, &def.field_type, path),
        }
    }

    fn validate_object(
        &self,
        obj: &Map<String, Value>,
        fields: &std::collections::BTreeMap<String, FieldDef>,
        prefix: &str,
    ) -> SchemaResult<()> {
        for key in obj.keys() {
            if !fields.contains_key(key) {
                return Err(self.fail(ValidationDetails::extra_field(make_path(prefix, key))));
            }
        }
        for (name, def) in fields {
            self.validate_field(obj.get(name), def, &make_path(prefix, name))?;
        }
        Ok(())
    }

    fn validate_value(&self, value: &Value, expected: &FieldType, path: &str) -> SchemaResult<()> {
        let ok = match expected {
            FieldType::String => value.is_string(),
            FieldType::Int => value.is_i64() || value.is_u64(),
            FieldType::Bool => value.is_boolean(),
            FieldType::Float => value.is_number(),
            FieldType::Any => true,
            FieldType::Object { fields } => {
                let obj = value
                    .as_object()
                    .ok_or_else(|| self.type_error(path, "object", value))?;
                return self.validate_object(obj, fields, path);
            }
            FieldType::Map { value_type } => {
                let obj = value
                    .as_object()
                    .ok_or_else(|| self.type_error(path, "map", value))?;
                for (key, item) in obj {
                    self.validate_value(item, value_type, &make_path(path, key))?;
                }
                return Ok(());
            }
            FieldType::Array { element_type } => {
                let items = value
                    .as_array()
                    .ok_or_else(|| self.type_error(path, "array", value))?;
                for (i, item) in items.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, i);
                    if item.is_null() {
                        return Err(self.fail(ValidationDetails::null_value(item_path)));
                    }
                    self.validate_value(item, element_type, &item_path)?;
                }
                return Ok(());
            }
        };

        if ok {
            Ok(())
        } else {
            Err(self.type_error(path, expected.type_name(), value))
        }
    }

    fn fail(&self, details: ValidationDetails) -> SchemaError {
        SchemaError::validation_failed(self.schema.name.as_str(), details)
    }

    fn type_error(&self, path: &str, expected: &str, actual: &Value) -> SchemaError {
        self.fail(ValidationDetails::type_mismatch(
            path,
            expected,
            json_type_name(actual),
        ))
    }
}

impl DocumentSchema {
    /// Validate a complete document
    pub fn validate_document(&self, document: &Document) -> SchemaResult<()> {
        SchemaValidator::full(self).validate(document)
    }

    /// Validate a possibly projected document
    pub fn validate_partial(&self, document: &Document) -> SchemaResult<()> {
        SchemaValidator::partial(self).validate(document)
    }
}

/// Returns the JSON type name for error messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn make_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::into_document;
    use serde_json::json;

    fn schema() -> DocumentSchema {
        DocumentSchema::new("materials")
            .field("material_id", FieldDef::required_string())
            .field("nelements", FieldDef::required(FieldType::Int))
            .field(
                "composition_reduced",
                FieldDef::optional(FieldType::map_of(FieldType::Float)),
            )
            .field("elements", FieldDef::optional(FieldType::array_of(FieldType::String)))
            .field("band_gap", FieldDef::optional_float().nullable())
    }

    fn doc(value: Value) -> Document {
        into_document(value).unwrap()
    }

    #[test]
    fn test_valid_document_passes() {
        let d = doc(json!({
            "material_id": "mp-1",
            "nelements": 2,
            "composition_reduced": {"Fe": 2, "O": 3.0},
            "elements": ["Fe", "O"],
            "band_gap": null
        }));
        assert!(schema().validate_document(&d).is_ok());
    }

    #[test]
    fn test_missing_required_field_fails_only_in_full_mode() {
        let d = doc(json!({"material_id": "mp-1"}));
        let err = schema().validate_document(&d).unwrap_err();
        assert_eq!(err.details().unwrap().field, "nelements");
        assert!(schema().validate_partial(&d).is_ok());
    }

    #[test]
    fn test_type_mismatch_reports_path() {
        let d = doc(json!({"material_id": "mp-1", "composition_reduced": {"Fe": "two"}}));
        let err = schema().validate_partial(&d).unwrap_err();
        assert_eq!(err.details().unwrap().field, "composition_reduced.Fe");

        let d = doc(json!({"material_id": "mp-1", "elements": ["Fe", 3]}));
        let err = schema().validate_partial(&d).unwrap_err();
        assert_eq!(err.details().unwrap().field, "elements[1]");
    }

    #[test]
    fn test_extra_field_and_null() {
        let d = doc(json!({"material_id": "mp-1", "nelements": 1, "secret": true}));
        assert!(schema().validate_document(&d).is_err());
        assert!(schema().allow_extra().validate_document(&d).is_ok());

        let d = doc(json!({"material_id": null, "nelements": 1}));
        let err = schema().validate_document(&d).unwrap_err();
        assert_eq!(err.details().unwrap().actual, "null");
    }
}
