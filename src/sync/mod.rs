//! Artifact handoff from the shared container into private storage

mod synchronizer;

pub use synchronizer::SharedContainerSynchronizer;

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::SyncError;

/// Result of a single handoff.
///
/// Every variant is non-fatal. The copy reflects whatever the shared
/// container held at call time; the extension may still be writing.
#[derive(Debug)]
pub enum SyncOutcome {
    /// Artifacts were copied and now replace any prior copy
    Copied {
        /// Number of regular files copied
        files: usize,
        /// Absolute path the artifacts were copied to
        destination: PathBuf,
    },
    /// Nothing exists at the source path; any prior copy was removed
    SourceMissing,
    /// No config has supplied a destination yet; nothing was written
    DestinationUnresolved,
    /// Copy failed; the prior copy (if any) was left in place
    Failed(SyncError),
}

impl SyncOutcome {
    pub fn is_copied(&self) -> bool {
        matches!(self, SyncOutcome::Copied { .. })
    }
}

/// Destination root shared between the config store (writer) and the
/// synchronizer (reader). `None` until a config blob resolves one.
#[derive(Debug, Clone, Default)]
pub struct SharedDestination {
    inner: Arc<RwLock<Option<PathBuf>>>,
}

impl SharedDestination {
    pub fn get(&self) -> Option<PathBuf> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set(&self, destination: &Path) {
        *self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(destination.to_path_buf());
    }
}
