//! # Service Configuration
//!
//! JSON configuration file with a default for every field. A handful of
//! environment variables override the file:
//!
//! - `MATAPI_PORT`
//! - `MATAPI_LOG_LEVEL`
//! - `MATAPI_SIGNING_SECRET`

mod errors;
mod loader;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use errors::{ConfigError, ConfigResult};
pub use loader::{ENV_LOG_LEVEL, ENV_PORT, ENV_SIGNING_SECRET, MAX_OBJECT_TTL_SECS};

use crate::resource::ResourceSettings;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 5001)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Reported in response metadata
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Bound on each store call
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    #[serde(default = "default_limit")]
    pub default_limit: u64,

    #[serde(default = "default_max_limit")]
    pub max_limit: u64,

    /// `tracing` filter directive (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,

    /// Directory of `<collection>.json` seed files
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub object_store: ObjectStoreConfig,

    #[serde(default)]
    pub access: AccessConfig,
}

/// Presigned object URL settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    #[serde(default = "default_bucket")]
    pub bucket: String,

    #[serde(default = "default_object_base_url")]
    pub base_url: String,

    #[serde(default = "default_signing_secret")]
    pub signing_secret: String,

    /// Grant lifetime (default: 3 days)
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

/// Gateway group handling
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Groups exempt from rate limiting
    #[serde(default)]
    pub unrestricted_groups: Vec<String>,

    /// Groups that see documents under every license
    #[serde(default)]
    pub privileged_groups: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_api_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_query_timeout_ms() -> u64 {
    30_000
}

fn default_limit() -> u64 {
    100
}

fn default_max_limit() -> u64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bucket() -> String {
    "materials-objects".to_string()
}

fn default_object_base_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_signing_secret() -> String {
    "change-me".to_string()
}

fn default_ttl_secs() -> u64 {
    3 * 24 * 60 * 60
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            base_url: default_object_base_url(),
            signing_secret: default_signing_secret(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            api_version: default_api_version(),
            query_timeout_ms: default_query_timeout_ms(),
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            log_level: default_log_level(),
            log_json: false,
            data_dir: None,
            object_store: ObjectStoreConfig::default(),
            access: AccessConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Settings shared by every resource
    pub fn resource_settings(&self) -> ResourceSettings {
        ResourceSettings {
            api_version: self.api_version.clone(),
            timeout: self.query_timeout(),
        }
    }
}
