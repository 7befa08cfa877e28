use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, WatchError};
use crate::event::{ChangeBatch, DirectoryEvent};
use crate::filter::PatternFilter;
use crate::watcher::{DirectoryWatcher, ListenerId};

/// A watch handle binding one shared [`DirectoryWatcher`] to a
/// per-subscriber [`PatternFilter`].
///
/// Each [`listen`](Self::listen) call registers a listener on the directory
/// watcher and forwards only the filtered, non-empty portion of every batch
/// to the given callback. Many subscriptions can share one directory; each
/// applies its own filter independently.
pub struct Subscription {
    watcher: Arc<DirectoryWatcher>,
    filter: PatternFilter,
    listener_ids: Vec<ListenerId>,
}

impl Subscription {
    pub(crate) fn new(watcher: Arc<DirectoryWatcher>, filter: PatternFilter) -> Self {
        Self {
            watcher,
            filter,
            listener_ids: Vec::new(),
        }
    }

    /// Register `callback` for filtered batches on this subscription's
    /// directory and filter configuration.
    ///
    /// The callback is synchronously invoked once at registration with a
    /// catch-up batch reflecting the files known at subscribe time (all
    /// reported as created), provided anything survives the filter. After
    /// that it receives one `Ok(batch)` per flush in which at least one
    /// category passed the filter; flushes where nothing passes are
    /// suppressed entirely. Watch-source failures arrive as `Err(_)` with
    /// no batch and do not disturb pending state.
    ///
    /// Callbacks run on watcher-internal threads while the per-directory
    /// lock is held, and must not call back into the same directory's
    /// watch machinery.
    pub fn listen<F>(&mut self, callback: F) -> ListenerId
    where
        F: Fn(Result<ChangeBatch>) + Send + Sync + 'static,
    {
        let filter = self.filter.clone();
        let id = self
            .watcher
            .add_listener(Arc::new(move |event: &DirectoryEvent| match event {
                DirectoryEvent::Batch(batch) => {
                    let filtered = ChangeBatch {
                        created: filter.filter_list(&batch.created),
                        updated: filter.filter_list(&batch.updated),
                        deleted: filter.filter_list(&batch.deleted),
                    };
                    if !filtered.is_empty() {
                        callback(Ok(filtered));
                    }
                }
                DirectoryEvent::Error(message) => {
                    callback(Err(WatchError::WatchSource(message.clone())));
                }
            }));
        self.listener_ids.push(id);
        id
    }

    /// Revoke every listener this subscription registered. The shared
    /// directory watcher itself stays alive for other subscribers.
    pub fn cancel(&mut self) {
        for id in self.listener_ids.drain(..) {
            self.watcher.remove_listener(id);
        }
    }

    /// Canonical directory this subscription watches.
    pub fn directory(&self) -> &Path {
        self.watcher.root()
    }
}
