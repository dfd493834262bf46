//! Panel manager configuration persistence
//!
//! Stored in `~/.config/panelkit/config.yaml`. Every field has a default, so partial files
//! and missing files both load.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::panel::PanelKey;

/// Panel kinds used by the dialog convenience wrappers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogPanels {
    #[serde(default)]
    pub alert: Option<PanelKey>,
    #[serde(default)]
    pub confirm: Option<PanelKey>,
    #[serde(default)]
    pub prompt: Option<PanelKey>,
}

/// Manager tuning that persists across sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Maximum number of preloaded (never opened) panels
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Seconds between hotness decay steps
    #[serde(default = "default_decay_interval_secs")]
    pub decay_interval_secs: f64,

    /// Hotness removed from every opened panel per decay step
    #[serde(default = "default_hot_weaken")]
    pub hot_weaken: i32,

    /// Hotness added on every open
    #[serde(default = "default_hot_increment")]
    pub hot_increment: i32,

    /// Level dialogs open on unless the request names one
    #[serde(default = "default_dialog_level")]
    pub dialog_level: i32,

    /// Stack used when a caller does not name one
    #[serde(default = "default_stack")]
    pub default_stack: String,

    #[serde(default)]
    pub dialogs: DialogPanels,
}

fn default_cache_capacity() -> usize {
    8
}

fn default_decay_interval_secs() -> f64 {
    10.0
}

fn default_hot_weaken() -> i32 {
    1
}

fn default_hot_increment() -> i32 {
    2
}

fn default_dialog_level() -> i32 {
    1000
}

fn default_stack() -> String {
    "main".to_string()
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            decay_interval_secs: default_decay_interval_secs(),
            hot_weaken: default_hot_weaken(),
            hot_increment: default_hot_increment(),
            dialog_level: default_dialog_level(),
            default_stack: default_stack(),
            dialogs: DialogPanels::default(),
        }
    }
}

impl PanelConfig {
    /// Decay interval as a duration; negative or non-finite values disable decay
    pub fn decay_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.decay_interval_secs).unwrap_or(Duration::ZERO)
    }

    /// Load config from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load config from an explicit file, or return defaults if it is missing or invalid
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), String> {
        let path = crate::config_paths::config_file()
            .ok_or_else(|| "No config directory available".to_string())?;
        self.save_to(&path)
    }

    /// Save config to `path`
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(path, content)
            .map_err(|e| format!("Failed to write config to {}: {}", path.display(), e))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }
}
