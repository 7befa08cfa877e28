use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::{Duration, Instant};

use indexmap::IndexSet;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use walkdir::WalkDir;

use crate::error::Result;
use crate::event::{DirectoryBatch, DirectoryEvent, RawEventKind};

/// Token returned by [`DirectoryWatcher::add_listener`], usable to revoke
/// the listener again.
pub type ListenerId = u64;

pub(crate) type Listener = Arc<dyn Fn(&DirectoryEvent) + Send + Sync>;

/// Aggregation state for one watched directory.
///
/// Invariants: a path is never in more than one of `pending_created` /
/// `pending_updated`; entering `pending_deleted` removes it from the other
/// two; `files` never contains a path currently only in `pending_deleted`.
struct WatchState {
    /// Relative paths currently known to exist under the root.
    files: IndexSet<PathBuf>,
    pending_created: IndexSet<PathBuf>,
    pending_updated: IndexSet<PathBuf>,
    pending_deleted: IndexSet<PathBuf>,
    /// When the last batch was flushed.
    last_emit: Instant,
    /// Deadline of the armed debounce timer, `None` while idle.
    next_flush_at: Option<Instant>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener_id: ListenerId,
}

/// Per-directory change aggregation engine.
///
/// Owns the raw notify subscription for one directory, maintains the live
/// file index and the pending-change sets, runs the debounce timer and fans
/// coalesced batches out to every registered listener. One instance is
/// shared (via the registry) by all subscriptions on the same canonical
/// directory path.
///
/// All state mutation and listener invocation happens under one per-watcher
/// mutex, so unrelated directories never serialize on each other. Listener
/// callbacks run under that lock and must not call back into the same
/// watcher.
pub struct DirectoryWatcher {
    root: PathBuf,
    debounce: Duration,
    state: Mutex<WatchState>,
    /// Keeps the notify subscription alive for the watcher's lifetime.
    /// `None` for watchers driven by synthetic events in tests.
    source: Mutex<Option<RecommendedWatcher>>,
    /// Self-reference handed to the notify callback and timer threads, so
    /// neither keeps the watcher alive on its own.
    weak: Weak<DirectoryWatcher>,
}

impl DirectoryWatcher {
    /// Create a watcher for `root`, establish the raw notify watch and seed
    /// the live index by scanning existing files.
    ///
    /// The scan feeds synthetic created events through the normal
    /// aggregation path, so pre-existing files both enter the index and are
    /// reported as created in the first flush, the same way a scanning
    /// event source would report them.
    pub(crate) fn spawn(root: PathBuf, debounce: Duration) -> Result<Arc<Self>> {
        let watcher = Self::detached(root, debounce);
        watcher.attach_source()?;
        watcher.scan_existing();
        Ok(watcher)
    }

    fn detached(root: PathBuf, debounce: Duration) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            root,
            debounce,
            state: Mutex::new(WatchState {
                files: IndexSet::new(),
                pending_created: IndexSet::new(),
                pending_updated: IndexSet::new(),
                pending_deleted: IndexSet::new(),
                last_emit: Instant::now(),
                next_flush_at: None,
                listeners: Vec::new(),
                next_listener_id: 0,
            }),
            source: Mutex::new(None),
            weak: weak.clone(),
        })
    }

    fn attach_source(&self) -> Result<()> {
        let weak = self.weak.clone();
        let mut source =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
                let Some(watcher) = weak.upgrade() else {
                    return;
                };
                match result {
                    Ok(event) => watcher.dispatch_notify(event),
                    Err(err) => watcher.on_source_error(&err.to_string()),
                }
            })?;
        source.watch(&self.root, RecursiveMode::Recursive)?;
        *self.lock_source() = Some(source);

        tracing::debug!("Watching directory: {}", self.root.display());
        Ok(())
    }

    fn scan_existing(&self) {
        for entry in WalkDir::new(&self.root) {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    self.on_raw_event(RawEventKind::Created, entry.path());
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!("Error scanning {}: {}", self.root.display(), err);
                }
            }
        }
    }

    fn dispatch_notify(&self, event: notify::Event) {
        use notify::event::{ModifyKind, RenameMode};

        // A rename within the tree arrives as one event carrying both
        // paths: the old path is gone, the new one exists.
        if let notify::EventKind::Modify(ModifyKind::Name(RenameMode::Both)) = event.kind {
            if event.paths.len() == 2 {
                self.on_raw_event(RawEventKind::Deleted, &event.paths[0]);
                self.on_raw_event(RawEventKind::Created, &event.paths[1]);
                return;
            }
        }

        let Some(kind) = RawEventKind::classify(&event.kind) else {
            return;
        };
        for path in &event.paths {
            self.on_raw_event(kind, path);
        }
    }

    /// Record one raw event and (re)arm the debounce timer.
    ///
    /// The latest classification of a path wins: created/updated are always
    /// overridable by a later deleted, and a delete-then-recreate within one
    /// window nets to a create. Deletions of paths that never entered the
    /// live index (directories, unseen paths) are dropped. If a full
    /// debounce window has already elapsed since the last flush, the flush
    /// happens synchronously on this call; otherwise a timer is armed for
    /// `last_emit + window` unless one is armed already.
    pub(crate) fn on_raw_event(&self, kind: RawEventKind, absolute: &Path) {
        let relative = match absolute.strip_prefix(&self.root) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative.to_path_buf(),
            _ => return,
        };

        // Directory creates/updates are not tracked; only files enter the
        // index. Deleted paths no longer exist to stat, so removals are
        // gated on the index below instead.
        if kind != RawEventKind::Deleted && absolute.is_dir() {
            return;
        }

        tracing::trace!("{:?}: {}", kind, relative.display());

        let mut state = self.lock_state();
        match kind {
            RawEventKind::Created => {
                state.files.insert(relative.clone());
                state.pending_updated.shift_remove(&relative);
                state.pending_deleted.shift_remove(&relative);
                state.pending_created.insert(relative);
            }
            RawEventKind::Updated => {
                state.files.insert(relative.clone());
                state.pending_deleted.shift_remove(&relative);
                // An update to a file whose create is still pending keeps
                // its created classification.
                if !state.pending_created.contains(&relative) {
                    state.pending_updated.insert(relative);
                }
            }
            RawEventKind::Deleted => {
                // Removal events also fire for directories and for paths
                // never observed as files; neither can be reported deleted.
                if !state.files.contains(&relative) && !state.pending_deleted.contains(&relative) {
                    return;
                }
                state.files.shift_remove(&relative);
                state.pending_created.shift_remove(&relative);
                state.pending_updated.shift_remove(&relative);
                state.pending_deleted.insert(relative);
            }
        }

        let now = Instant::now();
        let elapsed = now.duration_since(state.last_emit);
        if elapsed >= self.debounce {
            self.flush_locked(&mut state);
        } else if state.next_flush_at.is_none() {
            let deadline = state.last_emit + self.debounce;
            state.next_flush_at = Some(deadline);
            self.arm_timer(deadline, self.debounce - elapsed);
        }
    }

    fn arm_timer(&self, deadline: Instant, delay: Duration) {
        let weak = self.weak.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            let Some(watcher) = weak.upgrade() else {
                return;
            };
            let mut state = watcher.lock_state();
            // A synchronous flush may have superseded this timer; only the
            // deadline it was armed for is still ours to flush.
            if state.next_flush_at == Some(deadline) {
                watcher.flush_locked(&mut state);
            }
        });
    }

    /// Snapshot and clear the pending sets, then invoke every listener once
    /// with the coalesced batch. All three categories are present in the
    /// raw batch even when empty; suppression of empty deliveries is the
    /// subscription layer's job.
    fn flush_locked(&self, state: &mut WatchState) {
        let batch = DirectoryBatch {
            created: state.pending_created.drain(..).collect(),
            updated: state.pending_updated.drain(..).collect(),
            deleted: state.pending_deleted.drain(..).collect(),
        };
        state.last_emit = Instant::now();
        state.next_flush_at = None;

        // Flushes are only ever triggered by at least one event.
        debug_assert!(!batch.is_empty());

        tracing::debug!(
            "Flushing {}: {} created, {} updated, {} deleted",
            self.root.display(),
            batch.created.len(),
            batch.updated.len(),
            batch.deleted.len()
        );

        let event = DirectoryEvent::Batch(batch);
        for (_, listener) in &state.listeners {
            listener(&event);
        }
    }

    /// Fan a watch-source failure out to every listener. Pending state is
    /// left untouched; an error neither clears nor flushes changes.
    fn on_source_error(&self, message: &str) {
        tracing::error!("Watch source error for {}: {}", self.root.display(), message);

        let state = self.lock_state();
        let event = DirectoryEvent::Error(message.to_string());
        for (_, listener) in &state.listeners {
            listener(&event);
        }
    }

    /// Register a listener and synchronously deliver its one-time catch-up
    /// event: a batch whose created set is the current live-file snapshot,
    /// with empty updated/deleted. The catch-up always happens before any
    /// later flush can include the listener.
    pub(crate) fn add_listener(&self, listener: Listener) -> ListenerId {
        let mut state = self.lock_state();
        let id = state.next_listener_id;
        state.next_listener_id += 1;
        state.listeners.push((id, listener.clone()));

        let catchup = DirectoryEvent::Batch(DirectoryBatch {
            created: state.files.iter().cloned().collect(),
            updated: Vec::new(),
            deleted: Vec::new(),
        });
        listener(&catchup);
        id
    }

    /// Revoke a listener; later flushes skip it.
    pub(crate) fn remove_listener(&self, id: ListenerId) {
        self.lock_state().listeners.retain(|(lid, _)| *lid != id);
    }

    /// Canonical root this watcher observes.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The debounce window this watcher was created with.
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Snapshot of the live file index (relative paths), in the order the
    /// files became known.
    pub fn known_files(&self) -> Vec<PathBuf> {
        self.lock_state().files.iter().cloned().collect()
    }

    fn lock_state(&self) -> MutexGuard<'_, WatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_source(&self) -> MutexGuard<'_, Option<RecommendedWatcher>> {
        self.source.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
