//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/dreamlog/config.toml)
//! 3. Environment variables (DREAMLOG_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::view::{PaginationMode, DEFAULT_ENDLESS_INCREMENT};

/// Environment variable prefix
const ENV_PREFIX: &str = "DREAMLOG";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the SQLite database and the flat fallback store
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Default pagination: a page size, "all" or "endless"
    #[serde(default)]
    pub items_per_page: PaginationMode,

    /// Records added per endless-scroll load
    #[serde(default = "default_endless_increment")]
    pub endless_increment: usize,

    /// Seconds a delete stays pending before it is dropped
    #[serde(default = "default_delete_timeout_secs")]
    pub delete_timeout_secs: u64,

    /// Quiet period before a search or filter change is applied
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            items_per_page: PaginationMode::default(),
            endless_increment: default_endless_increment(),
            delete_timeout_secs: default_delete_timeout_secs(),
            search_debounce_ms: default_search_debounce_ms(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (DREAMLOG_DATA_DIR, DREAMLOG_ITEMS_PER_PAGE, ...)
    /// 2. Config file (~/.config/dreamlog/config.toml or DREAMLOG_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(cli_path: Option<&PathBuf>) -> Result<Self> {
        match cli_path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(val) = env_var("DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }

        if let Some(val) = env_var("ITEMS_PER_PAGE") {
            self.items_per_page = val
                .parse()
                .with_context(|| format!("Invalid {}_ITEMS_PER_PAGE", ENV_PREFIX))?;
        }

        if let Some(val) = env_var("ENDLESS_INCREMENT") {
            self.endless_increment = val
                .parse()
                .with_context(|| format!("Invalid {}_ENDLESS_INCREMENT", ENV_PREFIX))?;
        }

        if let Some(val) = env_var("DELETE_TIMEOUT_SECS") {
            self.delete_timeout_secs = val
                .parse()
                .with_context(|| format!("Invalid {}_DELETE_TIMEOUT_SECS", ENV_PREFIX))?;
        }

        if let Some(val) = env_var("SEARCH_DEBOUNCE_MS") {
            self.search_debounce_ms = val
                .parse()
                .with_context(|| format!("Invalid {}_SEARCH_DEBOUNCE_MS", ENV_PREFIX))?;
        }

        if let Some(val) = env_var("LOG_LEVEL") {
            self.log_level = val;
        }

        // Empty string clears it
        if let Some(val) = env_var("LOG_FILE") {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        Ok(())
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Set a single key from its textual value
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "items_per_page" => {
                self.items_per_page = value.parse().context("Invalid items_per_page")?;
            }
            "endless_increment" => {
                self.endless_increment = value.parse().context("Invalid endless_increment")?;
            }
            "delete_timeout_secs" => {
                self.delete_timeout_secs = value.parse().context("Invalid delete_timeout_secs")?;
            }
            "search_debounce_ms" => {
                self.search_debounce_ms = value.parse().context("Invalid search_debounce_ms")?;
            }
            "log_level" => self.log_level = value.to_string(),
            "log_file" => {
                self.log_file = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            other => anyhow::bail!("Unknown config key: {}", other),
        }
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with DREAMLOG_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Some(path) = env_var("CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dreamlog")
            .join("config.toml")
    }

    /// Get the path to the SQLite database
    pub fn sqlite_path(&self) -> PathBuf {
        self.data_dir.join("dreamlog.db")
    }

    /// Get the directory of the flat JSON fallback store
    pub fn flat_store_dir(&self) -> PathBuf {
        self.data_dir.join("flat")
    }

    pub fn delete_timeout(&self) -> Duration {
        Duration::from_secs(self.delete_timeout_secs)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, suffix)).ok()
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dreamlog")
}

fn default_endless_increment() -> usize {
    DEFAULT_ENDLESS_INCREMENT
}

fn default_delete_timeout_secs() -> u64 {
    5
}

fn default_search_debounce_ms() -> u64 {
    300
}

fn default_log_level() -> String {
    "warn".to_string()
}
