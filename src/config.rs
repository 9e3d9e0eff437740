//! Configuration management for the NeuroFlex record store
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.neuroflex/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::{Result, StoreError};

/// Complete store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

/// Record retention and key layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Prefix applied to every key before it reaches a backend
    pub namespace: String,
    /// Maximum number of training records kept locally
    pub max_records: usize,
    /// Horizon used when a write hits the device quota
    pub quota_recovery_days: u32,
    /// Default age for the cleanup sweep
    pub default_clean_days: u32,
    /// Quiet window for coalesced writes
    pub debounce_ms: u64,
}

/// Which device store to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Probe the native store once and fall back to web storage
    Auto,
    /// Browser-style key/value storage
    Web,
    /// Native app preference container
    Native,
}

/// Backend selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Directory for the native preference container and the web snapshot
    pub data_dir: String,
    /// Byte allotment; `None` means only the OS limit applies
    pub quota_bytes: Option<u64>,
}

/// Remote sync service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            namespace: "neuroflex_".to_string(),
            max_records: 1000,
            quota_recovery_days: 30,
            default_clean_days: 90,
            debounce_ms: 500,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Auto,
            data_dir: "~/.neuroflex/data".to_string(),
            quota_bytes: None,
        }
    }
}

impl RemoteConfig {
    /// Default request timeout
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Whether enough is configured to reach the remote service
    pub fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.api_key.is_some()
    }

    pub fn timeout(&self) -> std::time::Duration {
        let secs = if self.timeout_secs == 0 {
            Self::DEFAULT_TIMEOUT_SECS
        } else {
            self.timeout_secs
        };
        std::time::Duration::from_secs(secs)
    }
}

impl StoreConfig {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| StoreError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: StoreConfig = toml::from_str(&contents)
            .map_err(|e| StoreError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(StoreConfig::default())
    }

    /// Standard config location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".neuroflex").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.storage.namespace.is_empty() {
            return Err(StoreError::ConfigError(
                "namespace must not be empty".to_string(),
            ));
        }

        if self.storage.max_records == 0 {
            return Err(StoreError::ConfigError(
                "max_records must be greater than 0".to_string(),
            ));
        }

        if self.backend.quota_bytes == Some(0) {
            return Err(StoreError::ConfigError(
                "quota_bytes must be greater than 0 when set".to_string(),
            ));
        }

        if let Some(url) = &self.remote.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(StoreError::ConfigError(format!(
                    "remote base_url must be an http(s) URL: {}",
                    url
                )));
            }
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &PathBuf) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| StoreError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::ConfigError(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| StoreError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Resolved data directory
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.backend.data_dir)
    }
}
