//! Service settings
//!
//! Settings come from `DARET_*` environment variables, with `__` separating
//! nested keys (`DARET_SERVER__PORT=8080`). Database and JWT settings have
//! their own loaders.

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub access: AccessPolicy,
    pub join_code: JoinCodeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Ownership checks on the slot and confirmation endpoints.
///
/// Off by default: any authenticated user may read, change or delete a slot
/// or confirmation by id.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AccessPolicy {
    pub strict_ownership: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinCodeConfig {
    pub length: usize,
    /// Attempts at drawing an unused code before giving up
    pub max_attempts: u32,
}

impl AppConfig {
    /// Load the configuration from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3001_i64)?
            .set_default("access.strict_ownership", false)?
            .set_default("join_code.length", 8_i64)?
            .set_default("join_code.max_attempts", 10_i64)?
            .add_source(
                Environment::with_prefix("DARET")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3001,
            },
            access: AccessPolicy::default(),
            join_code: JoinCodeConfig {
                length: 8,
                max_attempts: 10,
            },
        }
    }
}
