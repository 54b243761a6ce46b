//! Application configuration
//!
//! Process-level settings from the command line. Service settings live in
//! [`crate::config::CatalystConfig`] and are loaded through
//! [`AppConfig::load_settings`].

use crate::config::{CatalystConfig, ConfigLoader};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Application configuration structure
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
    /// Working directory; the project config is looked up here
    pub working_dir: PathBuf,
    /// Explicit configuration file, bypassing the layered lookup
    pub config_path: Option<PathBuf>,
}

impl AppConfig {
    /// Create a new application configuration
    pub fn new(verbose: u8) -> Result<Self> {
        let working_dir =
            std::env::current_dir().context("Failed to get current directory")?;

        Ok(Self {
            verbose,
            working_dir,
            config_path: None,
        })
    }

    /// Set the working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Get the log level string based on verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            2 => "trace",
            _ => "trace,hyper=debug,reqwest=debug",
        }
    }

    /// Load and validate service settings
    pub async fn load_settings(&self) -> Result<CatalystConfig> {
        let settings = match &self.config_path {
            Some(path) => ConfigLoader::load_with_file(path).await?,
            None => ConfigLoader::load(&self.working_dir).await?,
        };
        Ok(settings)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            verbose: 0,
            working_dir: PathBuf::from("."),
            config_path: None,
        }
    }
}
