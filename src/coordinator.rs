//! Capture session coordinator
//!
//! Owns one instance of every component and wires them together. Construct
//! it once at startup and hand its dispatcher to whatever serves the capture
//! channel; there is no global instance.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::bridge::{NotificationBridge, UiContext};
use crate::capture::{CaptureHost, CaptureLifecycle, CaptureState};
use crate::config::Settings;
use crate::container::SharedContainer;
use crate::dispatch::CommandDispatcher;
use crate::store::ConfigStore;
use crate::sync::{SharedContainerSynchronizer, SharedDestination, SyncOutcome};
use crate::watch::ArtifactWatcher;

pub struct Coordinator {
    container: SharedContainer,
    artifact_path: String,
    bridge: NotificationBridge,
    synchronizer: Arc<SharedContainerSynchronizer>,
    store: Arc<ConfigStore>,
    lifecycle: Arc<CaptureLifecycle>,
}

impl Coordinator {
    pub fn new(settings: &Settings, host: Arc<dyn CaptureHost>) -> Self {
        let container = SharedContainer::new(&settings.container.shared_root);
        let artifact_path = settings.container.artifact_path.clone();
        let bridge = NotificationBridge::default();
        let destination = SharedDestination::default();

        let synchronizer = Arc::new(SharedContainerSynchronizer::new(
            container.clone(),
            destination.clone(),
            bridge.clone(),
        ));

        let store = Arc::new(ConfigStore::new(
            container.defaults(),
            settings.container.config_key.clone(),
            settings.config.destination_pointer.clone(),
            settings.config.unresolved_policy,
            artifact_path.clone(),
            destination,
            synchronizer.clone(),
        ));

        let lifecycle = Arc::new(CaptureLifecycle::new(
            host,
            synchronizer.clone(),
            artifact_path.clone(),
            bridge.clone(),
        ));

        info!(
            "Coordinator ready: shared root {:?}, artifacts {:?}, policy {:?}",
            container.root(),
            artifact_path,
            settings.config.unresolved_policy
        );

        Self {
            container,
            artifact_path,
            bridge,
            synchronizer,
            store,
            lifecycle,
        }
    }

    /// Dispatcher to register on the capture channel
    pub fn dispatcher(&self) -> CommandDispatcher {
        CommandDispatcher::new(self.lifecycle.clone(), self.store.clone())
    }

    /// Register the UI's notification listener
    pub fn set_listener(
        &self,
        context: UiContext,
        listener: impl Fn(Option<String>) + Send + Sync + 'static,
    ) {
        self.bridge.register(context, listener);
    }

    pub fn state(&self) -> CaptureState {
        self.lifecycle.state()
    }

    pub fn current_destination(&self) -> Option<PathBuf> {
        self.store.current_destination()
    }

    /// Run a handoff of the well-known artifact path outside start/stop
    pub async fn sync_artifacts(&self) -> SyncOutcome {
        self.synchronizer.sync(&self.artifact_path).await
    }

    /// Start reporting shared artifact changes through the bridge
    pub fn watch_artifacts(&self) -> notify::Result<ArtifactWatcher> {
        ArtifactWatcher::spawn(&self.container, &self.artifact_path, self.bridge.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{ui_context, CaptureEvent};
    use crate::capture::FakeHost;
    use crate::dispatch::{DispatchOutcome, MethodCall};
    use crate::store::UnresolvedConfigPolicy;
    use std::fs;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;

    fn settings(shared: &std::path::Path) -> Settings {
        let mut settings = Settings::default();
        settings.container.shared_root = shared.to_path_buf();
        settings
    }

    fn config_blob(dest: &std::path::Path) -> String {
        serde_json::json!({ "chara_detail": { "scraping_dir": dest } }).to_string()
    }

    #[tokio::test]
    async fn test_end_to_end_session_syncs_twice() {
        let shared = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        fs::create_dir_all(shared.path().join("images")).unwrap();
        fs::write(shared.path().join("images/before.png"), b"1").unwrap();

        let host = Arc::new(FakeHost::default());
        let coordinator = Coordinator::new(&settings(shared.path()), host.clone());
        let (ctx, mut ui) = ui_context();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        coordinator.set_listener(ctx, move |message| sink.lock().unwrap().push(message));

        let dispatcher = coordinator.dispatcher();
        let outcome = dispatcher
            .dispatch(MethodCall::new("setConfig", Some(config_blob(dest.path()))))
            .await;
        assert_eq!(outcome, DispatchOutcome::Success);
        assert_eq!(coordinator.current_destination(), Some(dest.path().to_path_buf()));

        assert_eq!(
            dispatcher.dispatch(MethodCall::new("startCapture", None)).await,
            DispatchOutcome::Success
        );
        assert_eq!(coordinator.state(), CaptureState::Recording);

        // The extension writes while recording
        fs::write(shared.path().join("images/during.png"), b"2").unwrap();

        assert_eq!(
            dispatcher.dispatch(MethodCall::new("stopCapture", None)).await,
            DispatchOutcome::Success
        );
        assert_eq!(coordinator.state(), CaptureState::Idle);
        assert_eq!(host.starts.load(Ordering::SeqCst), 1);
        assert_eq!(host.stops.load(Ordering::SeqCst), 1);
        assert!(dest.path().join("images/during.png").is_file());

        // Let host completions land, then drain the UI context
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        ui.run_pending();

        let events: Vec<CaptureEvent> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|m| serde_json::from_str(m.as_deref().unwrap()).unwrap())
            .collect();
        let syncs = events
            .iter()
            .filter(|e| matches!(e, CaptureEvent::ArtifactsSynced { .. }))
            .count();
        assert_eq!(syncs, 2);

        // A second handoff with nothing new yields the same content
        assert!(coordinator.sync_artifacts().await.is_copied());
        let mut names: Vec<_> = fs::read_dir(dest.path().join("images"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["before.png", "during.png"]);
    }

    #[tokio::test]
    async fn test_unknown_command_is_not_implemented() {
        let shared = tempfile::tempdir().unwrap();
        let coordinator = Coordinator::new(&settings(shared.path()), Arc::new(FakeHost::default()));
        let dispatcher = coordinator.dispatcher();

        assert_eq!(
            dispatcher.dispatch(MethodCall::new("pauseCapture", None)).await,
            DispatchOutcome::NotImplemented
        );
        assert_eq!(coordinator.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_bad_config_is_a_command_failure() {
        let shared = tempfile::tempdir().unwrap();
        let coordinator = Coordinator::new(&settings(shared.path()), Arc::new(FakeHost::default()));
        let dispatcher = coordinator.dispatcher();

        let outcome = dispatcher
            .dispatch(MethodCall::new("setConfig", Some("not json".to_string())))
            .await;
        assert!(
            matches!(outcome, DispatchOutcome::Failure { ref code, .. } if code == "ConfigError")
        );
        assert_eq!(coordinator.current_destination(), None);

        let outcome = dispatcher.dispatch(MethodCall::new("setConfig", None)).await;
        assert!(
            matches!(outcome, DispatchOutcome::Failure { ref code, .. } if code == "MissingArgument")
        );
    }

    #[tokio::test]
    async fn test_unpersisted_config_is_a_command_failure() {
        let dir = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        // A regular file where the shared root should be
        let shared = dir.path().join("shared");
        fs::write(&shared, b"not a directory").unwrap();

        let coordinator = Coordinator::new(&settings(&shared), Arc::new(FakeHost::default()));
        let outcome = coordinator
            .dispatcher()
            .dispatch(MethodCall::new("setConfig", Some(config_blob(dest.path()))))
            .await;

        assert!(
            matches!(outcome, DispatchOutcome::Failure { ref code, .. } if code == "PersistError")
        );
        assert!(coordinator.container.defaults().get("config").is_err());
    }

    #[tokio::test]
    async fn test_nothing_written_before_config_adopted() {
        let shared = tempfile::tempdir().unwrap();
        let mut settings = settings(shared.path());
        settings.config.unresolved_policy = UnresolvedConfigPolicy::Discard;
        let coordinator = Coordinator::new(&settings, Arc::new(FakeHost::default()));
        let dispatcher = coordinator.dispatcher();

        assert!(matches!(
            coordinator.sync_artifacts().await,
            SyncOutcome::DestinationUnresolved
        ));
        dispatcher
            .dispatch(MethodCall::new("setConfig", Some(r#"{"video_mode":true}"#.to_string())))
            .await;

        let entries: Vec<_> = fs::read_dir(shared.path()).unwrap().collect();
        assert!(entries.is_empty());
    }
}
