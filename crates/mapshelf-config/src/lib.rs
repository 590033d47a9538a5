//! Configuration management for mapshelf
//!
//! Handles the TOML configuration file (where maps live, how often to look for
//! map updates, where the remote listing comes from) and the client settings
//! file that persists small pieces of state between runs.

mod settings;

pub use settings::{ClientSettings, SettingsFile};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// System-wide configuration directory
pub const CONFIG_DIR: &str = "/etc/mapshelf";

/// Name of the configuration file inside a configuration directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Days between two automatic map update checks
pub const DEFAULT_CHECK_THRESHOLD_DAYS: u32 = 7;

/// Per-user configuration directory (`~/.config/mapshelf` on Linux)
pub fn user_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("mapshelf"))
}

/// Main mapshelf configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShelfConfig {
    #[serde(default)]
    pub maps: MapsConfig,

    #[serde(default)]
    pub updates: UpdatesConfig,
}

/// Where installed maps are kept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapsConfig {
    /// Directory scanned for map folders, map zips and map.yml files
    #[serde(default = "default_maps_dir")]
    pub dir: PathBuf,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            dir: default_maps_dir(),
        }
    }
}

/// Map update check settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdatesConfig {
    /// Minimum number of days between two update checks
    #[serde(default = "default_threshold_days")]
    pub threshold_days: u32,

    /// Remote listing document (YAML) to reconcile against
    #[serde(default)]
    pub listing: Option<PathBuf>,

    /// File holding persisted client settings such as the last check time
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,
}

impl Default for UpdatesConfig {
    fn default() -> Self {
        Self {
            threshold_days: default_threshold_days(),
            listing: None,
            settings_file: default_settings_file(),
        }
    }
}

fn default_maps_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("mapshelf").join("downloadedMaps"))
        .unwrap_or_else(|| PathBuf::from("downloadedMaps"))
}

fn default_threshold_days() -> u32 {
    DEFAULT_CHECK_THRESHOLD_DAYS
}

fn default_settings_file() -> PathBuf {
    user_config_dir()
        .map(|dir| dir.join("settings.toml"))
        .unwrap_or_else(|| PathBuf::from("settings.toml"))
}

impl ShelfConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations
    ///
    /// The system file is read first and the user file is layered on top of
    /// it, so a user only has to override the keys they care about.
    pub fn load_default() -> Result<Self, ConfigError> {
        let system_config = Path::new(CONFIG_DIR).join(CONFIG_FILE_NAME);
        let user_config = user_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME));

        let mut merged = toml::Value::Table(toml::map::Map::new());
        let mut found = false;

        for path in std::iter::once(system_config).chain(user_config) {
            if path.exists() {
                let contents = std::fs::read_to_string(&path)?;
                let overlay: toml::Value = toml::from_str(&contents)?;
                merge_toml(&mut merged, overlay);
                tracing::debug!("Loaded configuration layer {}", path.display());
                found = true;
            }
        }

        if !found {
            tracing::warn!("No configuration file found, using defaults");
            return Ok(Self::default());
        }

        let config: Self = merged.try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values no caller can work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.updates.threshold_days == 0 {
            return Err(ConfigError::Invalid(
                "updates.threshold_days must be at least 1".to_string(),
            ));
        }
        if self.maps.dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("maps.dir must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Helper function to merge TOML values
pub fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
