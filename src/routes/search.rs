//! Text and vector search over auxiliary collections

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::query::operators::{TextSearchQuery, VectorSearchQuery};
use crate::resource::AggregationResource;
use crate::store::{MemoryStore, StoreResult};

pub const TEXT_PREFIX: &str = "/search/text";
pub const VECTOR_PREFIX: &str = "/search/vector";

pub const TEXT_COLLECTION: &str = "descriptions";
pub const VECTOR_COLLECTION: &str = "embeddings";
pub const KEY: &str = "material_id";

pub const TEXT_FIELDS: [&str; 2] = ["formula_pretty", "description"];
pub const EMBEDDING_FIELD: &str = "embedding";
pub const EMBEDDING_DIMENSIONS: usize = 8;

pub fn text_resource(store: &MemoryStore, config: &ServiceConfig) -> StoreResult<AggregationResource> {
    let collection = store.seeded_collection(TEXT_COLLECTION, KEY, config.data_dir.as_deref())?;
    let operator = TextSearchQuery::new(TEXT_FIELDS, config.default_limit, config.max_limit);
    Ok(
        AggregationResource::new(collection, Arc::new(operator), config.resource_settings())
            .with_header_processor(super::header_processor(config)),
    )
}

pub fn vector_resource(store: &MemoryStore, config: &ServiceConfig) -> StoreResult<AggregationResource> {
    let collection = store.seeded_collection(VECTOR_COLLECTION, KEY, config.data_dir.as_deref())?;
    let operator = VectorSearchQuery::new(
        EMBEDDING_FIELD,
        EMBEDDING_DIMENSIONS,
        config.default_limit,
        config.max_limit,
    );
    Ok(
        AggregationResource::new(collection, Arc::new(operator), config.resource_settings())
            .with_header_processor(super::header_processor(config)),
    )
}
