use super::{get_global_config_dir, CatalystConfig, CONFIG_FILE_NAME, PROJECT_CONFIG_DIR};
use crate::error::{CatalystError, ErrorCode, Result};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::fs;
use tracing::debug;

/// Loads configuration layers into a shared `CatalystConfig`
pub struct ConfigLoader {
    config: Arc<RwLock<CatalystConfig>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(CatalystConfig::new())),
        }
    }

    /// Load every layer for `project_path`, then validate
    pub async fn load(project_path: &Path) -> Result<CatalystConfig> {
        let loader = Self::new();
        loader.load_global().await?;
        loader.load_project(project_path).await?;
        loader.finish()
    }

    /// Load an explicit file on top of the defaults, then validate
    pub async fn load_with_file(path: &Path) -> Result<CatalystConfig> {
        let loader = Self::new();
        if !path.exists() {
            return Err(CatalystError::config_with_code(
                ErrorCode::CONFIG_NOT_FOUND,
                format!("Configuration file not found: {}", path.display()),
            ));
        }
        loader.load_file(path).await?;
        loader.finish()
    }

    pub async fn load_global(&self) -> Result<()> {
        let config_path = get_global_config_dir()?.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            self.load_file(&config_path).await?;
        }
        Ok(())
    }

    pub async fn load_project(&self, project_path: &Path) -> Result<()> {
        let config_path = project_path.join(PROJECT_CONFIG_DIR).join(CONFIG_FILE_NAME);
        if config_path.exists() {
            self.load_file(&config_path).await?;
        }
        Ok(())
    }

    /// Overlay the keys present in `path`
    pub async fn load_file(&self, path: &Path) -> Result<()> {
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path).await.map_err(|e| {
            CatalystError::config_with_code(
                ErrorCode::CONFIG_PATH_ERROR,
                format!("Failed to read {}", path.display()),
            )
            .with_source(e)
        })?;
        let overlay: toml::Table = toml::from_str(&content)
            .map_err(|e| CatalystError::from(e).with_context(path.display()))?;

        let mut config = self.write();
        let current = toml::Value::try_from(&*config).map_err(|e| {
            CatalystError::config_with_code(ErrorCode::CONFIG_GENERIC, "Failed to merge configuration")
                .with_source(e)
        })?;
        let mut merged = current.as_table().cloned().unwrap_or_default();
        merged.extend(overlay);
        *config = toml::Value::Table(merged)
            .try_into::<CatalystConfig>()
            .map_err(|e| CatalystError::from(e).with_context(path.display()))?;

        Ok(())
    }

    pub fn get_config(&self) -> CatalystConfig {
        self.read().clone()
    }

    fn finish(&self) -> Result<CatalystConfig> {
        let mut config = self.write();
        config.merge_env_vars();
        config.validate()?;
        Ok(config.clone())
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalystConfig> {
        self.config.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalystConfig> {
        self.config.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
