//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/diary/config.toml)
//! 3. Environment variables (DIARY_* prefix)
//!
//! Environment variables take precedence over config file values.
//!
//! The remote store credential is only ever read (from the file or from
//! `DIARY_API_KEY`); it is never written back by `save()`.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::Subgroups;

/// Environment variable prefix
const ENV_PREFIX: &str = "DIARY";

/// Default remote document store endpoint (JSONBin v3 bins)
pub const DEFAULT_SYNC_URL: &str = "https://api.jsonbin.io/v3/b";

/// Credential for the remote document store
///
/// Kept out of `Debug` output and never serialized.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for building request headers
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for the local documents
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Base URL of the remote document store
    #[serde(default = "default_sync_url")]
    pub sync_url: String,

    /// Shared sync code for this deployment
    ///
    /// When set, it selects the remote record instead of the code stored in
    /// settings.
    #[serde(default)]
    pub sync_code: Option<String>,

    /// Remote store credential
    #[serde(default, skip_serializing)]
    pub api_key: Option<ApiKey>,

    /// Timeout for each remote request, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Delay before the startup sync, in milliseconds
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,

    /// Quiet period after a homework edit before syncing, in milliseconds
    #[serde(default = "default_edit_debounce_ms")]
    pub edit_debounce_ms: u64,

    /// How long a success/error status stays visible, in seconds
    #[serde(default = "default_status_display_secs")]
    pub status_display_secs: u64,

    /// Log file path (for DIARY_LOG output)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Subgroup-bearing subjects and their group counts
    #[serde(default)]
    pub subgroups: Subgroups,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            sync_url: default_sync_url(),
            sync_code: None,
            api_key: None,
            request_timeout_secs: default_request_timeout_secs(),
            startup_delay_ms: default_startup_delay_ms(),
            edit_debounce_ms: default_edit_debounce_ms(),
            status_display_secs: default_status_display_secs(),
            log_file: None,
            subgroups: Subgroups::default(),
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (DIARY_DATA_DIR, DIARY_SYNC_URL, DIARY_SYNC_CODE,
    ///    DIARY_API_KEY, DIARY_LOG_FILE)
    /// 2. Config file (~/.config/diary/config.toml or DIARY_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, honoring a `--config` path from the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_SYNC_URL", ENV_PREFIX)) {
            self.sync_url = if val.is_empty() {
                default_sync_url()
            } else {
                val
            };
        }

        // Empty string clears the shared code
        if let Ok(val) = std::env::var(format!("{}_SYNC_CODE", ENV_PREFIX)) {
            self.sync_code = if val.trim().is_empty() {
                None
            } else {
                Some(val.trim().to_string())
            };
        }

        if let Ok(val) = std::env::var(format!("{}_API_KEY", ENV_PREFIX)) {
            self.api_key = if val.is_empty() {
                None
            } else {
                Some(ApiKey::new(val))
            };
        }

        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Write a single key of this configuration into an existing file
    ///
    /// Every other entry of the file is kept as written, including an
    /// `api_key`. A key whose value serializes to nothing is removed.
    pub fn save_key_to_path(&self, key: &str, config_path: &PathBuf) -> Result<()> {
        let mut table = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;
            content
                .parse::<toml::Table>()
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?
        } else {
            toml::Table::new()
        };

        let current = toml::Table::try_from(self).context("Failed to serialize config")?;
        match current.get(key) {
            Some(value) => {
                table.insert(key.to_string(), value.clone());
            }
            None => {
                table.remove(key);
            }
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(&table).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with DIARY_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("diary")
            .join("config.toml")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn edit_debounce(&self) -> Duration {
        Duration::from_millis(self.edit_debounce_ms)
    }

    pub fn status_display(&self) -> Duration {
        Duration::from_secs(self.status_display_secs)
    }

    /// Default log file location
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("debug.log"))
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("diary")
}

fn default_sync_url() -> String {
    DEFAULT_SYNC_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_startup_delay_ms() -> u64 {
    1500
}

fn default_edit_debounce_ms() -> u64 {
    1000
}

fn default_status_display_secs() -> u64 {
    5
}
