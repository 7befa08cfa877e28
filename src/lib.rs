//! Deduplicated, debounced directory watching with per-subscriber glob
//! filters.
//!
//! Raw file-system events for a directory tree are coalesced into batched
//! create/update/delete sets on a fixed quiet-period timer. Concurrent
//! watchers of the same directory share a single raw watch, and every
//! subscriber applies its own include/exclude pattern filter to each batch.
//!
//! ```no_run
//! use batchwatch::{WatchConfig, WatchService};
//!
//! let service = WatchService::new();
//! let _subscription = service.watch(
//!     WatchConfig::new("./src").include("**/*.rs").exclude("**/*.tmp"),
//!     |result| match result {
//!         Ok(batch) => println!("{batch:?}"),
//!         Err(err) => eprintln!("watch failed: {err}"),
//!     },
//! )?;
//! # Ok::<(), batchwatch::WatchError>(())
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod filter;
pub mod registry;
pub mod service;
pub mod subscription;
pub mod watcher;

pub use config::{WatchConfig, DEFAULT_DEBOUNCE_MS};
pub use error::{Result, WatchError};
pub use event::{ChangeBatch, DirectoryBatch, DirectoryEvent, RawEventKind};
pub use filter::PatternFilter;
pub use registry::WatchRegistry;
pub use service::WatchService;
pub use subscription::Subscription;
pub use watcher::{DirectoryWatcher, ListenerId};
