//! # Deployed Resources
//!
//! Static wiring of collections, schemas and operator chains onto URL
//! prefixes. Each submodule declares one resource the way a deployment
//! would configure it.
//!
//! | Prefix | Resource |
//! |--------|----------|
//! | `/materials` | read-only materials summaries |
//! | `/submissions` | calculation requests |
//! | `/search/text` | text search over descriptions |
//! | `/search/vector` | nearest neighbours over embeddings |
//! | `/objects` | presigned URLs for raw calculation files |

pub mod materials;
pub mod objects;
pub mod search;
pub mod submissions;

use std::sync::Arc;

use serde::Serialize;

use crate::config::ServiceConfig;
use crate::query::IndexSpec;
use crate::resource::{HeaderProcessor, Resource};
use crate::store::{MemoryStore, StoreResult};

/// A resource bound to its URL prefix
#[derive(Clone)]
pub struct MountedResource {
    pub prefix: &'static str,
    pub resource: Arc<dyn Resource>,
}

impl std::fmt::Debug for MountedResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountedResource")
            .field("prefix", &self.prefix)
            .field("collection", &self.resource.collection_name())
            .finish()
    }
}

/// Indexes one mounted resource needs, as printed by `matapi indexes`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexReport {
    pub prefix: String,
    pub collection: String,
    pub indexes: Vec<IndexSpec>,
}

/// Build every resource over collections of `store`, seeding them from
/// `config.data_dir`
pub fn mount_all(store: &MemoryStore, config: &ServiceConfig) -> StoreResult<Vec<MountedResource>> {
    let mounted = vec![
        MountedResource {
            prefix: materials::PREFIX,
            resource: Arc::new(materials::resource(store, config)?),
        },
        MountedResource {
            prefix: submissions::PREFIX,
            resource: Arc::new(submissions::resource(store, config)?),
        },
        MountedResource {
            prefix: search::TEXT_PREFIX,
            resource: Arc::new(search::text_resource(store, config)?),
        },
        MountedResource {
            prefix: search::VECTOR_PREFIX,
            resource: Arc::new(search::vector_resource(store, config)?),
        },
        MountedResource {
            prefix: objects::PREFIX,
            resource: Arc::new(objects::resource(store, config)?),
        },
    ];

    for entry in &mounted {
        tracing::debug!(prefix = entry.prefix, collection = entry.resource.collection_name(), "Mounted resource");
    }
    Ok(mounted)
}

/// `ensure_indexes()` of every mounted resource
pub fn index_report(mounted: &[MountedResource]) -> Vec<IndexReport> {
    mounted
        .iter()
        .map(|entry| IndexReport {
            prefix: entry.prefix.to_string(),
            collection: entry.resource.collection_name().to_string(),
            indexes: entry.resource.ensure_indexes(),
        })
        .collect()
}

/// Header handling shared by all deployed resources
fn header_processor(config: &ServiceConfig) -> HeaderProcessor {
    HeaderProcessor::new(config.access.unrestricted_groups.iter().cloned())
}
