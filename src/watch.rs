//! Artifact watcher
//!
//! Observes the shared artifact path and reports changes as
//! `onArtifactsChanged` notifications. This is a best-effort signal about
//! what the extension has written. It never feeds the capture state.

use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::bridge::{CaptureEvent, NotificationBridge};
use crate::container::SharedContainer;

/// Keeps the underlying watcher alive; dropping it stops reporting
pub struct ArtifactWatcher {
    _watcher: RecommendedWatcher,
}

impl ArtifactWatcher {
    /// Watch `<shared root>/<artifact_path>`. The shared root is watched
    /// recursively so the artifact directory may appear later.
    pub fn spawn(
        container: &SharedContainer,
        artifact_path: &str,
        bridge: NotificationBridge,
    ) -> notify::Result<Self> {
        let root = container.root();
        std::fs::create_dir_all(root).map_err(notify::Error::io)?;

        let artifacts = container.resolve(artifact_path);
        // Some backends report canonical paths (e.g. /private/var on macOS)
        let canonical = std::fs::canonicalize(root)
            .map(|root| root.join(artifact_path))
            .unwrap_or_else(|_| artifacts.clone());
        let prefixes = vec![artifacts.clone(), canonical];

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let paths = artifact_paths(&event, &prefixes);
                    if paths.is_empty() {
                        return;
                    }
                    debug!("Shared artifacts changed: {:?}", paths);
                    bridge.emit_event(&CaptureEvent::ArtifactsChanged {
                        paths,
                        observed_at: chrono::Utc::now().timestamp_millis(),
                    });
                }
                Err(e) => warn!("Artifact watcher error: {}", e),
            },
            NotifyConfig::default(),
        )?;

        watcher.watch(root, RecursiveMode::Recursive)?;
        info!("Watching shared artifacts at {:?}", artifacts);

        Ok(Self { _watcher: watcher })
    }
}

/// Paths of a write/remove event that fall under one of `prefixes`
fn artifact_paths(event: &Event, prefixes: &[PathBuf]) -> Vec<String> {
    let relevant = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    if !relevant {
        return Vec::new();
    }

    event
        .paths
        .iter()
        .filter(|path| prefixes.iter().any(|prefix| path.starts_with(prefix)))
        .map(|path| path.display().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ui_context;
    use notify::event::{AccessKind, CreateKind};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn test_artifact_paths_filters_outside_changes() {
        let prefixes = vec![PathBuf::from("/shared/images")];
        let event = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/shared/images/a.png"))
            .add_path(PathBuf::from("/shared/defaults/config"));

        assert_eq!(artifact_paths(&event, &prefixes), vec!["/shared/images/a.png"]);

        let access = Event::new(EventKind::Access(AccessKind::Any))
            .add_path(PathBuf::from("/shared/images/a.png"));
        assert!(artifact_paths(&access, &prefixes).is_empty());
    }

    #[tokio::test]
    async fn test_watcher_reports_new_artifact() {
        let shared = tempfile::tempdir().unwrap();
        let container = SharedContainer::new(shared.path());
        let bridge = NotificationBridge::default();
        let (ctx, mut ui) = ui_context();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bridge.register(ctx, move |message| sink.lock().unwrap().push(message));

        let _watcher = ArtifactWatcher::spawn(&container, "images", bridge).unwrap();
        std::fs::create_dir_all(shared.path().join("images")).unwrap();
        std::fs::write(shared.path().join("images/a.png"), b"a").unwrap();

        let job = tokio::time::timeout(Duration::from_secs(10), ui.next_job())
            .await
            .expect("no artifact notification")
            .unwrap();
        job();

        let message = seen.lock().unwrap()[0].clone().unwrap();
        let event: CaptureEvent = serde_json::from_str(&message).unwrap();
        assert!(matches!(event, CaptureEvent::ArtifactsChanged { .. }));
    }
}
