//! Configuration
//!
//! Settings are layered: built-in defaults, the global `config.toml` in the
//! user config directory, the project `.catalyst/config.toml`, then
//! `CATALYST_*` environment variables.

use crate::batch::{DEFAULT_MODEL, DEFAULT_SETTLE_DELAY, DEFAULT_TOKENS_PER_LANGUAGE, DEFAULT_WINDOW_SIZE};
use crate::error::{CatalystError, ErrorCode, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub mod loader;

pub use loader::ConfigLoader;

/// Project-local configuration directory
pub const PROJECT_CONFIG_DIR: &str = ".catalyst";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Get the global Catalyst configuration directory
pub fn get_global_config_dir() -> Result<PathBuf> {
    ProjectDirs::from("com", "catalyst", "catalyst")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| {
            CatalystError::config_with_code(
                ErrorCode::CONFIG_PATH_ERROR,
                "Could not determine home directory",
            )
        })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CatalystConfig {
    /// Base URL of the backend serving generation, persistence and billing
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub model: String,
    /// Concurrent requests per window
    pub window_size: usize,
    /// Wait before the post-apply reload
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
    pub tokens_per_language: u64,
    pub request_timeout_secs: u64,
    pub log_level: Option<String>,
}

impl Default for CatalystConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            api_token: None,
            model: DEFAULT_MODEL.to_string(),
            window_size: DEFAULT_WINDOW_SIZE,
            settle_delay: DEFAULT_SETTLE_DELAY,
            tokens_per_language: DEFAULT_TOKENS_PER_LANGUAGE,
            request_timeout_secs: 60,
            log_level: Some("info".to_string()),
        }
    }
}

impl CatalystConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Overlay `CATALYST_*` environment variables
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn merge_env_vars(&mut self) {
        self.merge_from(|key| std::env::var(key).ok());
    }

    fn merge_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("CATALYST_API_BASE_URL") {
            self.api_base_url = url;
        }

        if let Some(token) = lookup("CATALYST_API_TOKEN") {
            self.api_token = Some(token);
        }

        if let Some(model) = lookup("CATALYST_MODEL") {
            self.model = model;
        }

        if let Some(log_level) = lookup("CATALYST_LOG_LEVEL") {
            self.log_level = Some(log_level);
        }

        if let Some(value) = lookup("CATALYST_WINDOW_SIZE") {
            match value.parse() {
                Ok(size) => self.window_size = size,
                Err(_) => warn!("Ignoring CATALYST_WINDOW_SIZE={}", value),
            }
        }

        if let Some(value) = lookup("CATALYST_TOKENS_PER_LANGUAGE") {
            match value.parse() {
                Ok(tokens) => self.tokens_per_language = tokens,
                Err(_) => warn!("Ignoring CATALYST_TOKENS_PER_LANGUAGE={}", value),
            }
        }

        if let Some(value) = lookup("CATALYST_REQUEST_TIMEOUT_SECS") {
            match value.parse() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(_) => warn!("Ignoring CATALYST_REQUEST_TIMEOUT_SECS={}", value),
            }
        }

        if let Some(value) = lookup("CATALYST_SETTLE_DELAY") {
            match humantime_serde::re::humantime::parse_duration(&value) {
                Ok(delay) => self.settle_delay = delay,
                Err(_) => warn!("Ignoring CATALYST_SETTLE_DELAY={}", value),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(invalid("window_size must be at least 1"));
        }

        if self.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs must be at least 1"));
        }

        let url = url::Url::parse(&self.api_base_url).map_err(|e| {
            invalid(format!("api_base_url '{}' is not a URL", self.api_base_url)).with_source(e)
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "api_base_url must use http or https, got '{}'",
                url.scheme()
            )));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> CatalystError {
    CatalystError::config_with_code(ErrorCode::CONFIG_INVALID_VALUE, message)
}
