//! Error types for the directory watcher.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur in the directory watcher.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Directory missing or inaccessible at scan time.
    #[error("directory unavailable: {}: {source}", .path.display())]
    DirectoryUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisted cache exists but is not in the expected shape.
    #[error("corrupt cache file {}: {source}", .path.display())]
    CorruptCache {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Persisted cache exists but could not be read.
    #[error("failed to read cache file {}: {source}", .path.display())]
    CacheReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Persisted cache could not be written.
    #[error("failed to write cache file {}: {source}", .path.display())]
    CacheWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The command could not be started or exited unsuccessfully.
    #[error("command failed for {}: {reason}", .file.display())]
    CommandInvocationFailed { file: PathBuf, reason: String },

    /// Invalid include or exclude pattern.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Command string could not be turned into an argument vector.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WatcherError {
    /// Whether a long-running monitor can carry on after this error.
    ///
    /// Unavailable directories and failed commands only affect one pass; a
    /// failed save leaves the cache dirty so a later pass saves it again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DirectoryUnavailable { .. }
                | Self::CommandInvocationFailed { .. }
                | Self::CacheWriteFailed { .. }
        )
    }
}
