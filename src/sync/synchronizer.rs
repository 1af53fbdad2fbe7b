//! Shared container synchronizer
//!
//! Copies a conventional relative path out of the shared container into
//! `<destination>/<relative>`. The copy is built in a staging directory next
//! to the destination and renamed into place, so the prior copy is only
//! removed once a complete new copy exists.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::bridge::{CaptureEvent, NotificationBridge};
use crate::container::{is_contained_relative, SharedContainer};
use crate::error::SyncError;

use super::{SharedDestination, SyncOutcome};

pub struct SharedContainerSynchronizer {
    container: SharedContainer,
    destination: SharedDestination,
    bridge: NotificationBridge,
}

impl SharedContainerSynchronizer {
    pub fn new(
        container: SharedContainer,
        destination: SharedDestination,
        bridge: NotificationBridge,
    ) -> Self {
        Self {
            container,
            destination,
            bridge,
        }
    }

    /// Replace `<destination>/<relative>` with the current contents of
    /// `<shared root>/<relative>`.
    ///
    /// No retries. The file work runs on the blocking pool.
    pub async fn sync(&self, relative: &str) -> SyncOutcome {
        let Some(destination_root) = self.destination.get() else {
            warn!("Skipping sync of {:?}: destination unresolved", relative);
            return SyncOutcome::DestinationUnresolved;
        };

        if !is_contained_relative(relative) {
            warn!("Refusing to sync non-relative artifact path {:?}", relative);
            return SyncOutcome::Failed(SyncError::InvalidPath(relative.to_string()));
        }

        let source = self.container.resolve(relative);
        let target = destination_root.join(relative);
        debug!("Syncing {:?} -> {:?}", source, target);

        let outcome = match tokio::task::spawn_blocking(move || replace_tree(&source, &target))
            .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => SyncOutcome::Failed(e),
            Err(e) => SyncOutcome::Failed(SyncError::Join(e.to_string())),
        };

        match &outcome {
            SyncOutcome::Copied { files, destination } => {
                info!("Synced {} artifact file(s) to {:?}", files, destination);
                self.bridge.emit_event(&CaptureEvent::ArtifactsSynced {
                    files: *files,
                    destination: destination.display().to_string(),
                });
            }
            SyncOutcome::SourceMissing => {
                debug!("No shared artifacts at {:?}", relative);
            }
            SyncOutcome::Failed(e) => {
                warn!("Artifact sync failed: {}", e);
                self.bridge.emit_event(&CaptureEvent::Error {
                    message: e.to_string(),
                });
            }
            SyncOutcome::DestinationUnresolved => {}
        }

        outcome
    }
}

/// Remove a file or directory tree; a missing entry counts as removed
fn remove_entry(path: &Path) -> std::io::Result<()> {
    let result = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// A missing source leaves nothing at the destination either
fn clear_target(target: &Path) -> Result<SyncOutcome, SyncError> {
    remove_entry(target).map_err(|e| SyncError::Remove {
        path: target.to_path_buf(),
        source: e,
    })?;
    Ok(SyncOutcome::SourceMissing)
}

fn replace_tree(source: &Path, target: &Path) -> Result<SyncOutcome, SyncError> {
    if !source.exists() {
        return clear_target(target);
    }

    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| SyncError::Copy {
        from: source.to_path_buf(),
        to: parent.to_path_buf(),
        source: e,
    })?;

    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifacts".to_string());

    // Removed on drop, so every early return below cleans up after itself
    let staging_dir = tempfile::Builder::new()
        .prefix(&format!(".{}.staging", name))
        .tempdir_in(parent)
        .map_err(|e| SyncError::Copy {
            from: source.to_path_buf(),
            to: parent.to_path_buf(),
            source: e,
        })?;
    let staging = staging_dir.path().join(&name);

    let Some(files) = copy_into(source, &staging)? else {
        debug!("Shared artifacts disappeared before sync: {:?}", source);
        return clear_target(target);
    };

    remove_entry(target).map_err(|e| SyncError::Remove {
        path: target.to_path_buf(),
        source: e,
    })?;

    std::fs::rename(&staging, target).map_err(|e| SyncError::Copy {
        from: staging.clone(),
        to: target.to_path_buf(),
        source: e,
    })?;

    Ok(SyncOutcome::Copied {
        files,
        destination: target.to_path_buf(),
    })
}

/// Copy `source` (file or directory) to `staging`, returning the number of
/// regular files copied, or `None` if `source` itself is gone. Files that
/// vanish mid-copy are skipped, since the extension may be rotating them.
fn copy_into(source: &Path, staging: &Path) -> Result<Option<usize>, SyncError> {
    let copy_err = |from: &Path, to: &Path, e: std::io::Error| SyncError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    };

    if source.is_file() {
        return match std::fs::copy(source, staging) {
            Ok(_) => Ok(Some(1)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(copy_err(source, staging, e)),
        };
    }

    let mut files = 0;
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if is_not_found(&e) && e.depth() == 0 => return Ok(None),
            Err(e) if is_not_found(&e) => continue,
            Err(e) => return Err(SyncError::Walk(e)),
        };

        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let to: PathBuf = staging.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            std::fs::create_dir_all(&to).map_err(|e| copy_err(entry.path(), &to, e))?;
        } else if file_type.is_file() {
            match std::fs::copy(entry.path(), &to) {
                Ok(_) => files += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("Artifact vanished during sync: {:?}", entry.path());
                }
                Err(e) => return Err(copy_err(entry.path(), &to, e)),
            }
        } else {
            debug!("Skipping non-regular artifact entry: {:?}", entry.path());
        }
    }

    Ok(Some(files))
}

fn is_not_found(e: &walkdir::Error) -> bool {
    e.io_error()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}
