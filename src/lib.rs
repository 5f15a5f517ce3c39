//! matapi - composable query operators and REST resources for materials
//! metadata collections
//!
//! Requests flow through a resource's ordered operator chain into one
//! composed query, run against a [`store::Collection`] under a timeout, and
//! come back post-processed inside a `{data, meta}` envelope.

pub mod chem;
pub mod cli;
pub mod config;
pub mod document;
pub mod http_server;
pub mod logging;
pub mod query;
pub mod resource;
pub mod routes;
pub mod schema;
pub mod store;

pub use document::Document;
