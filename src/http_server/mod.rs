//! # HTTP Server Module
//!
//! Combines the mounted resources into a single axum server.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - one nested router per mounted resource prefix

pub mod health;
pub mod server;

pub use health::{health_routes, HealthResponse};
pub use server::HttpServer;
