use crate::config::WatchConfig;
use crate::error::Result;
use crate::event::ChangeBatch;
use crate::filter::PatternFilter;
use crate::registry::WatchRegistry;
use crate::subscription::Subscription;

/// Entry point tying the registry, watchers and subscriptions together.
///
/// Owns its own [`WatchRegistry`], so watcher deduplication is scoped to
/// the service instance rather than the process. Construct one service per
/// application (or per test).
pub struct WatchService {
    registry: WatchRegistry,
}

impl WatchService {
    pub fn new() -> Self {
        Self {
            registry: WatchRegistry::new(),
        }
    }

    /// Start watching per `config` and deliver filtered batches to
    /// `callback`.
    ///
    /// `config` is anything convertible into a [`WatchConfig`]: a bare
    /// directory path or a full configuration with include/exclude globs.
    /// Configuration problems (missing directory, bad glob) fail here,
    /// synchronously, before any watch is established. The returned
    /// [`Subscription`] can [`listen`](Subscription::listen) again to add
    /// callbacks on the same filter configuration, or
    /// [`cancel`](Subscription::cancel) to revoke them.
    pub fn watch<C, F>(&self, config: C, callback: F) -> Result<Subscription>
    where
        C: Into<WatchConfig>,
        F: Fn(Result<ChangeBatch>) + Send + Sync + 'static,
    {
        let config = config.into();
        config.validate()?;

        let filter = PatternFilter::new(config.include.as_deref(), config.exclude.as_deref())?;
        let watcher = self.registry.get_or_create(&config)?;

        let mut subscription = Subscription::new(watcher, filter);
        subscription.listen(callback);
        Ok(subscription)
    }

    /// The registry backing this service.
    pub fn registry(&self) -> &WatchRegistry {
        &self.registry
    }
}

impl Default for WatchService {
    fn default() -> Self {
        Self::new()
    }
}
