//! Schema type definitions
//!
//! Supported types:
//! - string, int, bool, float
//! - object: nested object with its own fields
//! - array: homogeneous array with element type
//! - map: object with arbitrary keys and a single value type
//! - any: unchecked

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult};

/// Supported field types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    String,
    Int,
    Bool,
    /// Accepts integers as well
    Float,
    /// Nested object with its own field schema
    Object { fields: BTreeMap<String, FieldDef> },
    /// Homogeneous array with single element type
    Array {
        #[serde(rename = "element_type")]
        element_type: Box<FieldType>,
    },
    /// Arbitrary keys, one value type (e.g. `composition_reduced`)
    Map {
        #[serde(rename = "value_type")]
        value_type: Box<FieldType>,
    },
    Any,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Bool => "bool",
            FieldType::Float => "float",
            FieldType::Object { .. } => "object",
            FieldType::Array { .. } => "array",
            FieldType::Map { .. } => "map",
            FieldType::Any => "any",
        }
    }

    pub fn array_of(element_type: FieldType) -> Self {
        FieldType::Array {
            element_type: Box::new(element_type),
        }
    }

    pub fn map_of(value_type: FieldType) -> Self {
        FieldType::Map {
            value_type: Box::new(value_type),
        }
    }
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    #[serde(flatten)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub nullable: bool,
}

impl FieldDef {
    pub fn required(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: true,
            nullable: false,
        }
    }

    pub fn optional(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            nullable: false,
        }
    }

    pub fn required_string() -> Self {
        Self::required(FieldType::String)
    }

    pub fn optional_string() -> Self {
        Self::optional(FieldType::String)
    }

    pub fn optional_int() -> Self {
        Self::optional(FieldType::Int)
    }

    pub fn optional_float() -> Self {
        Self::optional(FieldType::Float)
    }

    /// Allow explicit nulls
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Schema of the documents in one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSchema {
    pub name: String,
    pub fields: BTreeMap<String, FieldDef>,
    /// Accept top-level fields the schema does not declare
    #[serde(default)]
    pub allow_extra: bool,
}

impl DocumentSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
            allow_extra: false,
        }
    }

    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    pub fn allow_extra(mut self) -> Self {
        self.allow_extra = true;
        self
    }

    /// Load a schema from a JSON file
    pub fn from_json_file(path: &Path) -> SchemaResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SchemaError::InvalidDefinition(format!("{}: {}", path.display(), e))
        })?;
        serde_json::from_str(&contents)
            .map_err(|e| SchemaError::InvalidDefinition(format!("{}: {}", path.display(), e)))
    }

    /// Top-level field names
    pub fn field_names(&self) -> BTreeSet<String> {
        self.fields.keys().cloned().collect()
    }

    /// Whether a dotted path is addressable under this schema
    pub fn has_path(&self, path: &str) -> bool {
        let mut parts = path.split('.');
        let first = match parts.next() {
            Some(first) => first,
            None => return false,
        };
        let mut current = match self.fields.get(first) {
            Some(def) => &def.field_type,
            None => return false,
        };

        for part in parts {
            current = match current {
                FieldType::Object { fields } => match fields.get(part) {
                    Some(def) => &def.field_type,
                    None => return false,
                },
                FieldType::Map { value_type } => value_type,
                FieldType::Array { element_type } => match part.parse::<usize>() {
                    Ok(_) => element_type,
                    Err(_) => return matches!(**element_type, FieldType::Object { .. } | FieldType::Any),
                },
                FieldType::Any => return true,
                _ => return false,
            };
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> DocumentSchema {
        let symmetry = FieldType::Object {
            fields: [("crystal_system".to_string(), FieldDef::optional_string())]
                .into_iter()
                .collect(),
        };
        DocumentSchema::new("materials")
            .field("material_id", FieldDef::required_string())
            .field("symmetry", FieldDef::optional(symmetry))
            .field(
                "composition_reduced",
                FieldDef::optional(FieldType::map_of(FieldType::Float)),
            )
    }

    #[test]
    fn test_has_path() {
        let schema = schema();
        assert!(schema.has_path("material_id"));
        assert!(schema.has_path("symmetry.crystal_system"));
        assert!(schema.has_path("composition_reduced.Fe"));
        assert!(!schema.has_path("symmetry.space_group"));
        assert!(!schema.has_path("material_id.x"));
        assert!(!schema.has_path("unknown"));
    }

    #[test]
    fn test_schema_deserializes() {
        let json = r#"{
            "name": "tasks",
            "fields": {
                "task_id": {"type": "string", "required": true},
                "elements": {"type": "array", "element_type": {"type": "string"}},
                "energy": {"type": "float", "nullable": true}
            }
        }"#;
        let schema: DocumentSchema = serde_json::from_str(json).unwrap();
        assert!(schema.fields["task_id"].required);
        assert!(schema.fields["energy"].nullable);
        assert_eq!(
            schema.fields["elements"].field_type,
            FieldType::array_of(FieldType::String)
        );
    }
}
