//! Error types for directory watching.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for watch operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors that can occur while configuring or running a watch.
#[derive(Error, Debug)]
pub enum WatchError {
    /// No directory was given.
    #[error("missing directory parameter")]
    MissingDirectory,

    /// The configured path exists but is not a directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// An include/exclude glob failed to compile.
    #[error("invalid glob pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// The underlying file-system watch reported a failure. Delivered
    /// asynchronously through subscription callbacks, never thrown.
    #[error("watch source error: {0}")]
    WatchSource(String),

    /// Notify error while establishing a watch.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
