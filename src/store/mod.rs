//! # Store
//!
//! The collection abstraction resources execute queries against, plus an
//! in-memory implementation.

pub mod collection;
pub mod errors;
pub mod matcher;
pub mod memory;
pub mod pipeline;

pub use collection::{Collection, FindOptions, SortDirection, SortSpec, StoreFuture};
pub use errors::{StoreError, StoreResult};
pub use memory::{MemoryCollection, MemoryStore};
