//! Loading, environment overrides and validation

use std::path::Path;

use super::errors::{ConfigError, ConfigResult};
use super::ServiceConfig;

pub const ENV_PORT: &str = "MATAPI_PORT";
pub const ENV_LOG_LEVEL: &str = "MATAPI_LOG_LEVEL";
pub const ENV_SIGNING_SECRET: &str = "MATAPI_SIGNING_SECRET";

/// Longest lifetime of a presigned object URL (7 days)
pub const MAX_OBJECT_TTL_SECS: u64 = 7 * 24 * 60 * 60;

impl ServiceConfig {
    /// Load from `path`, apply process environment overrides and validate
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the file without overrides or validation
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Apply overrides from `lookup` (the process environment in `load`)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_PORT) {
            self.port = port.trim().parse().map_err(|_| ConfigError::InvalidOverride {
                var: ENV_PORT.to_string(),
                value: port.clone(),
            })?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(secret) = lookup(ENV_SIGNING_SECRET) {
            self.object_store.signing_secret = secret;
        }
        Ok(())
    }

    /// Reject inconsistent settings
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_limit == 0 {
            return Err(ConfigError::Invalid("max_limit must be > 0".to_string()));
        }
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(ConfigError::Invalid(format!(
                "default_limit ({}) must be between 1 and max_limit ({})",
                self.default_limit, self.max_limit
            )));
        }
        if self.query_timeout_ms == 0 {
            return Err(ConfigError::Invalid("query_timeout_ms must be > 0".to_string()));
        }
        if self.object_store.signing_secret.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "object_store.signing_secret must not be empty".to_string(),
            ));
        }
        if self.object_store.ttl_secs == 0 || self.object_store.ttl_secs > MAX_OBJECT_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "object_store.ttl_secs must be between 1 and {}",
                MAX_OBJECT_TTL_SECS
            )));
        }
        match url::Url::parse(&self.object_store.base_url) {
            Ok(url) if !url.cannot_be_a_base() => {}
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "object_store.base_url '{}' is not a usable base URL",
                    self.object_store.base_url
                )))
            }
        }
        Ok(())
    }
}
