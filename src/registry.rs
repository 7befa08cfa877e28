use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::WatchConfig;
use crate::error::{Result, WatchError};
use crate::watcher::DirectoryWatcher;

/// Cache mapping a canonical directory path to its single shared
/// [`DirectoryWatcher`].
///
/// Guarantees at most one raw file-system watch per directory no matter how
/// many subscriptions request it. Not a process-wide singleton: callers own
/// a registry (usually through [`WatchService`](crate::WatchService)) and
/// can construct one per test for isolation.
pub struct WatchRegistry {
    watchers: Mutex<HashMap<PathBuf, Arc<DirectoryWatcher>>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self {
            watchers: Mutex::new(HashMap::new()),
        }
    }

    /// Return the watcher for the configured directory, creating it (and
    /// establishing the underlying raw watch plus the initial scan) on
    /// first use.
    ///
    /// The directory path is canonicalized for keying, so distinct
    /// spellings of the same directory collapse to one watcher. The cache
    /// lock is held across creation: when subscriptions race on the same
    /// path the first creation wins and the rest observe the cached
    /// instance.
    pub fn get_or_create(&self, config: &WatchConfig) -> Result<Arc<DirectoryWatcher>> {
        config.validate()?;

        let canonical = std::fs::canonicalize(&config.directory)?;
        if !canonical.is_dir() {
            return Err(WatchError::NotADirectory(canonical));
        }

        let mut watchers = self.lock_watchers();
        if let Some(existing) = watchers.get(&canonical) {
            // Directory-level options only take effect on first creation.
            if existing.debounce() != config.debounce_duration() {
                tracing::warn!(
                    "Ignoring debounce_ms={} for already-watched {}: keeping {}ms",
                    config.debounce_ms,
                    canonical.display(),
                    existing.debounce().as_millis()
                );
            }
            return Ok(existing.clone());
        }

        let watcher = DirectoryWatcher::spawn(canonical.clone(), config.debounce_duration())?;
        watchers.insert(canonical, watcher.clone());
        Ok(watcher)
    }

    /// Number of directories currently watched.
    pub fn len(&self) -> usize {
        self.lock_watchers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_watchers().is_empty()
    }

    fn lock_watchers(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<DirectoryWatcher>>> {
        self.watchers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for WatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}
