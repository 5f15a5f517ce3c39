//! Presigned download URLs for raw calculation files

use crate::config::ServiceConfig;
use crate::resource::signing::SigningResult;
use crate::resource::{ObjectSigner, ObjectUrlResource};
use crate::store::{MemoryStore, StoreError, StoreResult};

pub const PREFIX: &str = "/objects";
pub const COLLECTION: &str = "calculation_files";
pub const KEY: &str = "object_key";

pub fn signer(config: &ServiceConfig) -> SigningResult<ObjectSigner> {
    let store = &config.object_store;
    let ttl_secs = i64::try_from(store.ttl_secs).unwrap_or(i64::MAX);
    ObjectSigner::new(
        store.bucket.clone(),
        &store.base_url,
        store.signing_secret.as_bytes(),
        chrono::Duration::seconds(ttl_secs),
    )
}

pub fn resource(store: &MemoryStore, config: &ServiceConfig) -> StoreResult<ObjectUrlResource> {
    let collection = store.seeded_collection(COLLECTION, KEY, config.data_dir.as_deref())?;
    let signer = signer(config).map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
    Ok(
        ObjectUrlResource::new(collection, signer, config.resource_settings())
            .with_header_processor(super::header_processor(config)),
    )
}
