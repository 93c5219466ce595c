//! Configuration file handling for the Shopdesk CLI
//!
//! Manages configuration stored in `~/.config/shopdesk/config.toml` (or
//! platform equivalent).
//!
//! ## Example Config File
//!
//! ```toml
//! [trial]
//! length_days = 10
//! recheck_minutes = 60
//!
//! [output]
//! default_format = "human"
//! color = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::trial::DEFAULT_TRIAL_LENGTH_DAYS;

// Config file format version
// Bump this when making breaking changes to the config structure
const CONFIG_VERSION: u32 = 1;

/// Root configuration for Shopdesk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopdeskConfig {
    /// Config file format version for migrations
    #[serde(default)]
    pub version: u32,

    /// Trial window settings
    #[serde(default)]
    pub trial: TrialConfig,

    /// Output format settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Trial window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialConfig {
    /// Trial window length in days
    #[serde(default = "default_length_days")]
    pub length_days: i64,

    /// Observer re-check interval in minutes
    #[serde(default = "default_recheck_minutes")]
    pub recheck_minutes: u64,
}

/// Output format configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format (human, json)
    #[serde(default = "default_format")]
    pub default_format: String,

    /// Use colored output
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_length_days() -> i64 {
    DEFAULT_TRIAL_LENGTH_DAYS
}

fn default_recheck_minutes() -> u64 {
    60
}

fn default_format() -> String {
    "human".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ShopdeskConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            trial: TrialConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            length_days: default_length_days(),
            recheck_minutes: default_recheck_minutes(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: default_format(),
            color: true,
        }
    }
}

impl ShopdeskConfig {
    /// Get the default configuration file path
    ///
    /// Returns platform-specific config directory:
    /// - Linux: `~/.config/shopdesk/config.toml`
    /// - macOS: `~/Library/Application Support/shopdesk/config.toml`
    /// - Windows: `%APPDATA%\shopdesk\config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shopdesk")
            .join("config.toml")
    }

    /// Load configuration from the default path
    pub fn load() -> Self {
        Self::load_from(Self::default_path())
    }

    /// Load configuration from a specific path
    ///
    /// Returns default configuration if the file doesn't exist or can't be
    /// parsed. Migrates outdated versions in place.
    pub fn load_from(path: PathBuf) -> Self {
        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<Self>(&content) {
                Ok(mut config) => {
                    tracing::debug!("Loaded config from {:?}", path);
                    let original_version = config.version;
                    config.migrate_if_needed();
                    if config.version != original_version {
                        tracing::info!(
                            "Config migrated from version {} to {}",
                            original_version,
                            config.version
                        );
                        if let Err(e) = config.save_to(path.clone()) {
                            tracing::warn!("Failed to persist migrated config {:?}: {}", path, e);
                        }
                    }
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config at {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::debug!("Config file not found at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    fn migrate_if_needed(&mut self) {
        match self.version {
            0 => {
                // Unversioned (v0) configs predate the trial section; a
                // zero-day window would lock the trial immediately.
                if self.trial.length_days <= 0 {
                    self.trial.length_days = default_length_days();
                }
                self.version = CONFIG_VERSION;
            }
            CONFIG_VERSION => {}
            _ => {
                tracing::warn!(
                    "Config version {} is newer than supported version {}. Some features may not work correctly.",
                    self.version,
                    CONFIG_VERSION
                );
            }
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(Self::default_path())
    }

    /// Save configuration to a specific path, creating parent directories.
    pub fn save_to(&self, path: PathBuf) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        std::fs::write(&path, content)?;
        tracing::debug!("Saved config to {:?}", path);

        Ok(())
    }

    /// Get a configuration value by key path (dot notation).
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["trial", "length_days"] => Some(self.trial.length_days.to_string()),
            ["trial", "recheck_minutes"] => Some(self.trial.recheck_minutes.to_string()),
            ["output", "default_format"] => Some(self.output.default_format.clone()),
            ["output", "color"] => Some(self.output.color.to_string()),
            _ => None,
        }
    }

    /// Set a configuration value by key path (dot notation).
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["trial", "length_days"] => {
                let parsed: i64 = value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    expected: "positive integer".to_string(),
                })?;
                if parsed <= 0 {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                        expected: "positive integer".to_string(),
                    });
                }
                self.trial.length_days = parsed;
            }
            ["trial", "recheck_minutes"] => {
                let parsed: u64 = value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    expected: "positive integer".to_string(),
                })?;
                if parsed == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                        expected: "positive integer".to_string(),
                    });
                }
                self.trial.recheck_minutes = parsed;
            }
            ["output", "default_format"] => {
                if !["human", "json"].contains(&value) {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                        expected: "human or json".to_string(),
                    });
                }
                self.output.default_format = value.to_string();
            }
            ["output", "color"] => {
                self.output.color = value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    expected: "true or false".to_string(),
                })?;
            }
            _ => {
                return Err(ConfigError::UnknownKey(key.to_string()));
            }
        }

        Ok(())
    }

    /// List all configuration keys with their current values
    pub fn list(&self) -> Vec<(String, String)> {
        vec![
            (
                "trial.length_days".to_string(),
                self.trial.length_days.to_string(),
            ),
            (
                "trial.recheck_minutes".to_string(),
                self.trial.recheck_minutes.to_string(),
            ),
            (
                "output.default_format".to_string(),
                self.output.default_format.clone(),
            ),
            ("output.color".to_string(), self.output.color.to_string()),
        ]
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("Invalid value for {key}: '{value}' (expected {expected})")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
