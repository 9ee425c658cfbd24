//! Local settings for the watcher process.
//!
//! These are tuning knobs read from an optional TOML file; the directory
//! rules themselves always come from the peer during the handshake.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::aggregator::{DEFAULT_DEBOUNCE, DEFAULT_IDLE};
use crate::error::Result;
use crate::filter::ExtensionFilter;

/// Tuning for the watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherSettings {
    /// Quiescence window in milliseconds.
    pub debounce_ms: u64,

    /// Timer sleep while nothing is pending, in seconds.
    pub idle_secs: u64,

    /// Which file extensions are reported.
    pub extensions: ExtensionFilter,
}

impl WatcherSettings {
    /// Load settings from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parse settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Set the debounce window.
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// The debounce window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// The idle sleep.
    pub fn idle(&self) -> Duration {
        Duration::from_secs(self.idle_secs)
    }
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            debounce_ms: u64::try_from(DEFAULT_DEBOUNCE.as_millis()).unwrap_or(u64::MAX),
            idle_secs: DEFAULT_IDLE.as_secs(),
            extensions: ExtensionFilter::default(),
        }
    }
}
