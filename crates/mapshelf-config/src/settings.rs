//! Persisted client settings
//!
//! A tiny TOML file of values the client remembers between runs. Every setter
//! writes the whole file back immediately.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ConfigError;

/// On-disk shape of the settings file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsFile {
    /// Epoch milliseconds of the last map update check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_map_update_check: Option<i64>,
}

/// Settings bound to the file they were loaded from
#[derive(Debug, Clone)]
pub struct ClientSettings {
    path: PathBuf,
    values: SettingsFile,
}

impl ClientSettings {
    /// Open the settings file, starting empty if it does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let values = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            toml::from_str(&contents)?
        } else {
            SettingsFile::default()
        };

        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn values(&self) -> &SettingsFile {
        &self.values
    }

    pub fn last_map_update_check(&self) -> Option<i64> {
        self.values.last_map_update_check
    }

    /// Set the last map update check and flush to disk
    pub fn set_last_map_update_check(&mut self, epoch_millis: i64) -> Result<(), ConfigError> {
        self.values.last_map_update_check = Some(epoch_millis);
        self.flush()
    }

    /// Write the current values to disk
    pub fn flush(&self) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(&self.values)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&self.path, contents)?;
        tracing::debug!("Client settings written to {}", self.path.display());
        Ok(())
    }
}
