//! Error types for the capture coordinator
//!
//! None of these are fatal to the process. Host and sync failures are logged
//! and reported as notifications; config failures are returned to the
//! command caller.

use std::path::PathBuf;

/// Failure reported by a host capture primitive
#[derive(Debug, Clone, thiserror::Error)]
pub enum HostError {
    /// The user or OS refused the capture request
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// No recorder is configured or reachable on this host
    #[error("No recorder available: {0}")]
    Unavailable(String),

    /// The recorder was reached but the operation failed
    #[error("Host capture failed: {0}")]
    Failed(String),
}

/// Rejection of a config blob
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Blob is not valid JSON
    #[error("Config is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Blob parsed but the destination path is absent or not a string
    #[error("Config has no destination directory at {pointer}")]
    MissingDestination { pointer: String },
}

/// I/O failure while copying artifacts out of the shared container
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Artifact path must be relative to the shared container: {0:?}")]
    InvalidPath(String),

    #[error("Failed to remove stale artifacts at {path:?}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {from:?} to {to:?}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk shared artifacts: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Sync task panicked: {0}")]
    Join(String),
}

/// Failure reading or writing the shared durable key/value area
#[derive(Debug, thiserror::Error)]
pub enum DefaultsError {
    #[error("Invalid defaults key: {0:?}")]
    InvalidKey(String),

    #[error("Failed to write defaults entry {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read defaults entry {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
