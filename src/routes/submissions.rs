//! Calculation requests submitted by users and advanced by workers

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::query::operators::{PaginationQuery, SchemaPayloadQuery, SortQuery, SubmissionQuery};
use crate::resource::{SubmissionResource, SUBMISSION_ID};
use crate::schema::{DocumentSchema, FieldDef, FieldType};
use crate::store::{MemoryStore, StoreResult};

pub const PREFIX: &str = "/submissions";
pub const COLLECTION: &str = "submissions";

/// Fields a submission id is derived from
pub const KEY_FIELDS: [&str; 2] = ["formula", "task_type"];

pub fn schema() -> DocumentSchema {
    let history_entry = FieldType::Object {
        fields: [
            ("state".to_string(), FieldDef::required_string()),
            ("timestamp".to_string(), FieldDef::required_string()),
        ]
        .into_iter()
        .collect(),
    };

    DocumentSchema::new(COLLECTION)
        .field(SUBMISSION_ID, FieldDef::required_string())
        .field("formula", FieldDef::required_string())
        .field("task_type", FieldDef::required_string())
        .field("parameters", FieldDef::optional(FieldType::Any))
        .field("comment", FieldDef::optional_string())
        .field("state", FieldDef::required_string())
        .field("last_updated", FieldDef::required_string())
        .field("history", FieldDef::optional(FieldType::array_of(history_entry)))
}

pub fn resource(store: &MemoryStore, config: &ServiceConfig) -> StoreResult<SubmissionResource> {
    let collection = store.seeded_collection(COLLECTION, SUBMISSION_ID, config.data_dir.as_deref())?;
    let schema = Arc::new(schema());
    let key_fields: Vec<String> = KEY_FIELDS.iter().map(|f| f.to_string()).collect();

    Ok(SubmissionResource::new(
        collection,
        schema.clone(),
        key_fields.clone(),
        config.resource_settings(),
    )
    .with_operator(Arc::new(SubmissionQuery))
    .with_operator(Arc::new(
        SortQuery::new(2).with_allowed_fields(["last_updated", "state"]),
    ))
    .with_operator(Arc::new(PaginationQuery::new(
        config.default_limit,
        config.max_limit,
    )))
    .with_payload_operator(Arc::new(SchemaPayloadQuery::new(schema, key_fields)))
    .with_header_processor(super::header_processor(config)))
}
