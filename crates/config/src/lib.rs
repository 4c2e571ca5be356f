//! hrgate configuration structures mapping the hrgate.toml file.

#![deny(missing_docs)]

mod auth;
mod cors;
mod loader;
mod rate_limit;
mod security_headers;
mod server;

use std::path::Path;

pub use auth::{AuthConfig, JwtAlgorithm};
pub use cors::*;
pub use rate_limit::RateLimitConfig;
pub use security_headers::SecurityHeadersConfig;
pub use server::{HealthConfig, ServerConfig, TlsServerConfig};
use serde::Deserialize;

/// Main configuration structure, loaded once at startup.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server and admission settings.
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from a file path, expanding `{{ env.VAR }}` strings.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        loader::load(path)
    }

    /// Validates the configuration, returning warnings for settings that work but look wrong.
    pub fn validate(&self) -> anyhow::Result<Vec<String>> {
        loader::validate(self)
    }
}
