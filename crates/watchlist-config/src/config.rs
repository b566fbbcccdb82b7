use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::paths::PathManager;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Prefix of every watchlist endpoint, e.g. `http://localhost:8090/api/v1`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Overrides `<data_dir>/storage`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_watchlist_key")]
    pub watchlist_key: String,
    #[serde(default = "default_sync_flag_key")]
    pub sync_flag_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://localhost:8090/api/v1".to_string()
}

fn default_timeout_seconds() -> u64 {
    15
}

fn default_watchlist_key() -> String {
    "team4s_watchlist".to_string()
}

fn default_sync_flag_key() -> String {
    "team4s_watchlist_synced".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: None,
            watchlist_key: default_watchlist_key(),
            sync_flag_key: default_sync_flag_key(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl StorageConfig {
    pub fn resolve_dir(&self, path_manager: &PathManager) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| path_manager.storage_dir())
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the file if present, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let base_url = self.api.base_url.trim();
        if base_url.is_empty() {
            return Err(anyhow::anyhow!("api.base_url cannot be empty"));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(anyhow::anyhow!("api.base_url must start with http:// or https://: {}", base_url));
        }
        if self.api.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("api.timeout_seconds must be greater than zero"));
        }

        if self.storage.watchlist_key.trim().is_empty() {
            return Err(anyhow::anyhow!("storage.watchlist_key cannot be empty"));
        }
        if self.storage.sync_flag_key.trim().is_empty() {
            return Err(anyhow::anyhow!("storage.sync_flag_key cannot be empty"));
        }
        if self.storage.watchlist_key == self.storage.sync_flag_key {
            return Err(anyhow::anyhow!("storage.watchlist_key and storage.sync_flag_key must differ"));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(anyhow::anyhow!("Invalid logging.level: {}", self.logging.level));
        }

        Ok(())
    }
}
