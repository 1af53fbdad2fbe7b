//! Config store
//!
//! Adopts config blobs pushed by the UI. The only thing the coordinator
//! itself reads from a blob is the artifact destination directory; the raw
//! blob is handed to the extension process through the shared defaults area.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::container::SharedDefaults;
use crate::error::ConfigError;
use crate::sync::{SharedContainerSynchronizer, SharedDestination, SyncOutcome};

/// What to do with a blob that does not yield a destination directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedConfigPolicy {
    /// Still persist the raw blob so the extension sees it
    #[default]
    Persist,
    /// Leave the previously persisted blob untouched
    Discard,
}

/// Result of adopting a config blob
#[derive(Debug)]
pub struct ConfigUpdate {
    /// Newly resolved destination directory
    pub destination: PathBuf,
    /// Whether the raw blob reached the shared defaults area
    pub persisted: bool,
    /// Handoff triggered by the update
    pub sync: SyncOutcome,
}

pub struct ConfigStore {
    defaults: SharedDefaults,
    config_key: String,
    destination_pointer: String,
    policy: UnresolvedConfigPolicy,
    artifact_path: String,
    destination: SharedDestination,
    synchronizer: Arc<SharedContainerSynchronizer>,
}

impl ConfigStore {
    pub fn new(
        defaults: SharedDefaults,
        config_key: impl Into<String>,
        destination_pointer: impl Into<String>,
        policy: UnresolvedConfigPolicy,
        artifact_path: impl Into<String>,
        destination: SharedDestination,
        synchronizer: Arc<SharedContainerSynchronizer>,
    ) -> Self {
        Self {
            defaults,
            config_key: config_key.into(),
            destination_pointer: destination_pointer.into(),
            policy,
            artifact_path: artifact_path.into(),
            destination,
            synchronizer,
        }
    }

    /// Adopt `blob` as the current config.
    ///
    /// On success the destination is replaced, the raw blob is persisted and
    /// the artifact path is synced. On failure the destination is unchanged
    /// and the blob is persisted only under [`UnresolvedConfigPolicy::Persist`].
    pub async fn set_config(&self, blob: &str) -> Result<ConfigUpdate, ConfigError> {
        let destination = match resolve_destination(blob, &self.destination_pointer) {
            Ok(destination) => destination,
            Err(e) => {
                warn!("Rejecting config ({} bytes): {}", blob.len(), e);
                if self.policy == UnresolvedConfigPolicy::Persist {
                    self.persist(blob);
                }
                return Err(e);
            }
        };

        self.destination.set(&destination);
        info!("Artifact destination set to {:?}", destination);

        let persisted = self.persist(blob);
        let sync = self.synchronizer.sync(&self.artifact_path).await;

        Ok(ConfigUpdate {
            destination,
            persisted,
            sync,
        })
    }

    /// Last successfully resolved destination directory
    pub fn current_destination(&self) -> Option<PathBuf> {
        self.destination.get()
    }

    fn persist(&self, blob: &str) -> bool {
        match self.defaults.set(&self.config_key, blob) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to persist config for extension: {}", e);
                false
            }
        }
    }
}

/// Parse `blob` and extract the destination directory at `pointer`
pub fn resolve_destination(blob: &str, pointer: &str) -> Result<PathBuf, ConfigError> {
    let value: serde_json::Value = serde_json::from_str(blob)?;
    value
        .pointer(pointer)
        .and_then(|dir| dir.as_str())
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| ConfigError::MissingDestination {
            pointer: pointer.to_string(),
        })
}
