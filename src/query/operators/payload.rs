//! Schema validation of submission bodies

use std::sync::Arc;

use super::super::errors::{QueryError, QueryResult};
use super::super::operator::PayloadOperator;
use crate::document::Document;
use crate::schema::DocumentSchema;

/// Fields the server owns on submission documents
pub const SERVER_FIELDS: [&str; 3] = ["submission_id", "last_updated", "history"];

/// Rejects bodies that do not fit the collection schema or set
/// server-managed fields
#[derive(Debug, Clone)]
pub struct SchemaPayloadQuery {
    schema: Arc<DocumentSchema>,
    key_fields: Vec<String>,
}

impl SchemaPayloadQuery {
    pub fn new(schema: Arc<DocumentSchema>, key_fields: Vec<String>) -> Self {
        Self { schema, key_fields }
    }
}

impl PayloadOperator for SchemaPayloadQuery {
    fn name(&self) -> &str {
        "schema_payload"
    }

    fn validate(&self, payload: Document) -> QueryResult<Document> {
        if let Some(field) = SERVER_FIELDS.iter().find(|f| payload.contains_key(**f)) {
            return Err(QueryError::InvalidPayload(format!(
                "'{}' is set by the server",
                field
            )));
        }
        for key in &self.key_fields {
            if !payload.contains_key(key) {
                return Err(QueryError::InvalidPayload(format!(
                    "missing key field '{}'",
                    key
                )));
            }
        }
        self.schema
            .validate_partial(&payload)
            .map_err(|e| QueryError::InvalidPayload(e.to_string()))?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::into_document;
    use crate::schema::{FieldDef, FieldType};
    use serde_json::json;

    fn operator() -> SchemaPayloadQuery {
        let schema = DocumentSchema::new("submissions")
            .field("submission_id", FieldDef::required_string())
            .field("user", FieldDef::required_string())
            .field("nsites", FieldDef::optional(FieldType::Int));
        SchemaPayloadQuery::new(Arc::new(schema), vec!["user".to_string()])
    }

    #[test]
    fn test_payload_validation() {
        let ok = into_document(json!({"user": "alice", "nsites": 4})).unwrap();
        assert!(operator().validate(ok).is_ok());

        let wrong_type = into_document(json!({"user": "alice", "nsites": "four"})).unwrap();
        assert!(operator().validate(wrong_type).is_err());

        let missing_key = into_document(json!({"nsites": 4})).unwrap();
        assert!(operator().validate(missing_key).is_err());

        let server_field = into_document(json!({"user": "a", "submission_id": "x"})).unwrap();
        let err = operator().validate(server_field).unwrap_err();
        assert!(err.to_string().contains("submission_id"));
    }
}
