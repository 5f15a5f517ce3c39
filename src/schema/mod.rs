//! # Document Schemas
//!
//! Field-level schemas for collection documents. Resources validate
//! returned documents against them (strict or pass-through) and submission
//! payloads before any write; projection operators use them to reject
//! unknown fields.

mod errors;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaResult, ValidationDetails};
pub use types::{DocumentSchema, FieldDef, FieldType};
pub use validator::SchemaValidator;
