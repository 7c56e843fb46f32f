// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{ProxyError, Result};
use config::{Config, Environment, File};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Prefix for structured environment overrides, e.g. `GEMINI_CHAT_CACHE__TTL_SECONDS`.
pub const ENV_PREFIX: &str = "GEMINI_CHAT";

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. `PORT` / `GEMINI_API_KEY` environment variables (highest)
    /// 2. `GEMINI_CHAT_*` environment variables
    /// 3. Config file
    /// 4. Defaults (lowest)
    ///
    /// CLI flags are applied on top by the caller.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        Self::load_from(config_path, std::env::vars().collect())
    }

    /// Same as [`AppConfig::load`] but reads variables from `vars` instead of
    /// the process environment.
    pub fn load_from(config_path: Option<&Path>, vars: HashMap<String, String>) -> Result<Self> {
        let file_source = match config_path {
            // An explicitly named file must exist
            Some(path) => File::from(path).required(true),
            None => File::from(Self::default_config_path()).required(false),
        };

        let config = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file_source)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(vars.clone())),
            )
            .set_override_option("server.port", vars.get("PORT").cloned())?
            .set_override_option("gemini.api_key", vars.get("GEMINI_API_KEY").cloned())?
            .build()
            .map_err(|e| ProxyError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ProxyError::Config(e.to_string()))
    }

    /// Reject configurations the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        match &self.gemini.api_key {
            Some(key) if !key.is_blank() => {}
            _ => {
                return Err(ProxyError::Config(
                    "GEMINI_API_KEY is not set; the server cannot reach Gemini without it"
                        .to_string(),
                ))
            }
        }

        if self.gemini.model.trim().is_empty() {
            return Err(ProxyError::Config("gemini.model must not be empty".to_string()));
        }

        if self.dispatch.request_timeout_seconds == 0 {
            return Err(ProxyError::Config(
                "dispatch.request_timeout_seconds must be greater than zero".to_string(),
            ));
        }

        if self.server.workers == 0 {
            return Err(ProxyError::Config("server.workers must be at least 1".to_string()));
        }

        Ok(())
    }

    fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gemini-chat")
            .join("config.toml")
    }
}
