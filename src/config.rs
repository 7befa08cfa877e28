//! Configuration for watch subscriptions.
//!
//! A [`WatchConfig`] names the directory to watch plus the per-subscriber
//! include/exclude globs. The debounce window is a directory-level option:
//! it takes effect when the underlying directory watcher is first created
//! and is shared by every later subscription on the same directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchError};

/// Quiet period between coalesced batches, in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Configuration for a single watch subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Directory to watch (required).
    pub directory: PathBuf,
    /// Glob a relative path must match to be reported (optional).
    #[serde(default)]
    pub include: Option<String>,
    /// Glob a relative path must not match to be reported (optional).
    #[serde(default)]
    pub exclude: Option<String>,
    /// Debounce window in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

impl WatchConfig {
    /// Create a config watching `directory` with no pattern filters.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            include: None,
            exclude: None,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }

    /// Set the include glob.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include = Some(pattern.into());
        self
    }

    /// Set the exclude glob.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude = Some(pattern.into());
        self
    }

    /// Set the debounce window in milliseconds.
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    /// Get the debounce window as a duration.
    pub fn debounce_duration(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.directory.as_os_str().is_empty() {
            return Err(WatchError::MissingDirectory);
        }
        Ok(())
    }
}

impl From<&str> for WatchConfig {
    fn from(directory: &str) -> Self {
        Self::new(directory)
    }
}

impl From<String> for WatchConfig {
    fn from(directory: String) -> Self {
        Self::new(directory)
    }
}

impl From<&Path> for WatchConfig {
    fn from(directory: &Path) -> Self {
        Self::new(directory)
    }
}

impl From<PathBuf> for WatchConfig {
    fn from(directory: PathBuf) -> Self {
        Self::new(directory)
    }
}
