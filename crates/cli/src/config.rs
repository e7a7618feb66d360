//! Runtime settings
//!
//! Read from an optional TOML file and overridden by command-line flags.
//! Settings are never written back.

use crate::args::Cli;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings file looked up in the watched root
pub const CONFIG_FILE_NAME: &str = "lastsave.toml";

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Restore hotkey (default: F8)
    #[serde(default = "default_hotkey")]
    pub hotkey: String,

    /// Backups stay paused this long after a restore (default: 1000)
    #[serde(default = "default_restore_grace_ms")]
    pub restore_grace_ms: u64,

    /// Quiet period before a changed save is backed up (default: 100)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Additional log file
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hotkey: default_hotkey(),
            restore_grace_ms: default_restore_grace_ms(),
            debounce_ms: default_debounce_ms(),
            log_file: None,
        }
    }
}

fn default_hotkey() -> String {
    "F8".to_string()
}

fn default_restore_grace_ms() -> u64 {
    1000
}

fn default_debounce_ms() -> u64 {
    100
}

impl Settings {
    /// Parse a settings file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Load the explicit config file, else `<root>/lastsave.toml`, else defaults
    pub fn discover(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let default_path = root.join(CONFIG_FILE_NAME);
        if default_path.is_file() {
            Self::load(&default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(hotkey) = &cli.hotkey {
            self.hotkey = hotkey.clone();
        }
        if let Some(ms) = cli.grace_ms {
            self.restore_grace_ms = ms;
        }
        if let Some(ms) = cli.debounce_ms {
            self.debounce_ms = ms;
        }
        if let Some(path) = &cli.log_file {
            self.log_file = Some(path.clone());
        }
    }

    pub fn restore_grace(&self) -> Duration {
        Duration::from_millis(self.restore_grace_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
