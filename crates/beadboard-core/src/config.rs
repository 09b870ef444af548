//! Sync configuration: debounce windows and watch target paths.
//!
//! Loaded from `.beadboard/config.toml` under the project root when it
//! exists, otherwise built-in defaults apply. The two debounce windows
//! are independent tunables: `watch_debounce_ms` (W1) coalesces raw
//! filesystem bursts inside the watch layer, `notify_debounce_ms` (W2)
//! coalesces delivery to subscribers. Worst-case latency from an
//! external write to a subscriber callback is W1 + W2, sequential.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Relative path of the config file under the project root.
pub const CONFIG_PATH: &str = ".beadboard/config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Watch-stage trailing debounce window in milliseconds (W1).
    pub watch_debounce_ms: u32,
    /// Delivery-stage trailing debounce window in milliseconds (W2).
    pub notify_debounce_ms: u32,
    /// Discovery database file, relative to the project root.
    pub discovery_db: PathBuf,
    /// Beads task-record directory, relative to the project root.
    pub beads_dir: PathBuf,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            watch_debounce_ms: 100,
            notify_debounce_ms: 150,
            discovery_db: PathBuf::from(".beads/discovery.db"),
            beads_dir: PathBuf::from(".beads/issues"),
        }
    }
}

impl SyncConfig {
    /// Load configuration for a project, falling back to defaults when
    /// no config file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read
    /// or parsed, or if the loaded values fail validation.
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(CONFIG_PATH);

        let config = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                Error::io_error(format!("Failed to read {}: {e}", path.display()))
            })?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate debounce windows and target paths.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if either debounce window is
    /// outside the 10-5000ms range or a target path is empty.
    pub fn validate(&self) -> Result<()> {
        validate_window("watch_debounce_ms", self.watch_debounce_ms)?;
        validate_window("notify_debounce_ms", self.notify_debounce_ms)?;

        if self.discovery_db.as_os_str().is_empty() {
            return Err(Error::invalid_config("discovery_db must not be empty"));
        }
        if self.beads_dir.as_os_str().is_empty() {
            return Err(Error::invalid_config("beads_dir must not be empty"));
        }

        Ok(())
    }

    /// Watch-stage window (W1) as a [`Duration`].
    #[must_use]
    pub const fn watch_window(&self) -> Duration {
        Duration::from_millis(self.watch_debounce_ms as u64)
    }

    /// Delivery-stage window (W2) as a [`Duration`].
    #[must_use]
    pub const fn notify_window(&self) -> Duration {
        Duration::from_millis(self.notify_debounce_ms as u64)
    }

    /// Discovery database path resolved against a project root.
    #[must_use]
    pub fn discovery_db_in(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.discovery_db)
    }

    /// Beads record directory resolved against a project root.
    #[must_use]
    pub fn beads_dir_in(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.beads_dir)
    }
}

fn validate_window(name: &str, ms: u32) -> Result<()> {
    if !(10..=5000).contains(&ms) {
        return Err(Error::invalid_config(format!(
            "{name} must be between 10 and 5000, got {ms}"
        )));
    }
    Ok(())
}
