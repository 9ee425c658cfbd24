//! Error types for the directory watcher.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur in the directory watcher.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Primary root does not exist or is not a directory.
    #[error("directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// The OS notifier reported an internal error; its events can no longer be trusted.
    #[error("notifier failed: {0}")]
    NotifierFailed(#[source] notify::Error),

    /// The notifier channel closed underneath the event loop.
    #[error("notifier channel closed")]
    NotifierClosed,

    /// Notify error.
    #[error("notify error: {0}")]
    Notify(#[from] notify::Error),

    /// Peer protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] filesync_protocol::ProtocolError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file could not be parsed.
    #[error("invalid settings: {0}")]
    Settings(#[from] toml::de::Error),
}
