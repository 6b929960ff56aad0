//! Configuration types.
//!
//! Bulk-action settings live in `bulk.toml` under the dossier config
//! directory. A missing file means defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::selection::SelectAllPolicy;

/// Default cap on concurrently selected items.
pub const DEFAULT_MAX_SELECTION: usize = 100;

/// Default undo window length in milliseconds.
pub const DEFAULT_UNDO_TTL_MS: u64 = 30_000;

/// Default countdown quantum in milliseconds.
pub const DEFAULT_TICK_MS: u64 = 100;

/// Runtime configuration for the bulk-action lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    /// Upper bound on selected items.
    pub max_selection: usize,

    /// How long the undo window stays open.
    pub undo_ttl_ms: u64,

    /// Countdown tick quantum.
    pub tick_ms: u64,

    /// What select-all does past the cap.
    pub select_all_policy: SelectAllPolicy,

    /// Keystroke that triggers undo while the window is open, e.g. "mod+z".
    pub undo_shortcut: String,

    /// Number of actions shown inline in the toolbar before the overflow menu.
    pub inline_actions: usize,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            max_selection: DEFAULT_MAX_SELECTION,
            undo_ttl_ms: DEFAULT_UNDO_TTL_MS,
            tick_ms: DEFAULT_TICK_MS,
            select_all_policy: SelectAllPolicy::Cap,
            undo_shortcut: "mod+z".to_string(),
            inline_actions: 3,
        }
    }
}

/// Round an undo TTL in milliseconds to whole seconds.
pub fn ttl_seconds(ttl_ms: u64) -> u64 {
    (ttl_ms + 500) / 1000
}

impl BulkConfig {
    pub fn undo_ttl(&self) -> Duration {
        Duration::from_millis(self.undo_ttl_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Whole seconds shown in the "undo available" notice.
    pub fn undo_seconds(&self) -> u64 {
        ttl_seconds(self.undo_ttl_ms)
    }

    /// Parse from TOML text and validate.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: BulkConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_selection == 0 {
            return Err(ConfigError::Invalid {
                field: "max_selection",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "tick_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.tick_ms > self.undo_ttl_ms {
            return Err(ConfigError::Invalid {
                field: "tick_ms",
                reason: format!("must not exceed undo_ttl_ms ({})", self.undo_ttl_ms),
            });
        }
        if self.undo_shortcut.trim().is_empty() {
            return Err(ConfigError::InvalidShortcut(self.undo_shortcut.clone()));
        }
        Ok(())
    }
}

/// Get the config directory path.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("dossier"))
}

/// Get the path to bulk.toml.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("bulk.toml"))
}

/// Load configuration from a specific file. A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<BulkConfig, ConfigError> {
    if !path.exists() {
        tracing::info!("No config found at {:?}, using defaults", path);
        return Ok(BulkConfig::default());
    }

    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
    let config = BulkConfig::from_toml(&text)?;
    tracing::info!("Loaded config from {:?}", path);
    Ok(config)
}

/// Load configuration from the platform config directory.
pub fn load_config() -> Result<BulkConfig, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    load_config_from(&path)
}
