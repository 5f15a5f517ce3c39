//! Concrete query operators

pub mod formula;
pub mod keys;
pub mod numeric;
pub mod pagination;
pub mod payload;
pub mod search;
pub mod sort;
pub mod sparse_fields;
pub mod submission;

pub use formula::{ChemsysQuery, ElementsQuery, FormulaQuery};
pub use keys::KeysQuery;
pub use numeric::NumericQuery;
pub use pagination::PaginationQuery;
pub use payload::SchemaPayloadQuery;
pub use search::{TextSearchQuery, VectorSearchQuery};
pub use sort::SortQuery;
pub use sparse_fields::SparseFieldsQuery;
pub use submission::{submission_id, SubmissionQuery, SubmissionState};
