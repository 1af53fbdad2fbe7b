//! Capture lifecycle state machine
//!
//! Tracks the requested capture state and issues start/stop requests to the
//! host. The state records intent only: the recording itself happens in an
//! extension process whose real state cannot be observed from here.
//!
//! Host failures do not roll the state back. A failed start leaves the state
//! at Recording until an explicit stop; this can disagree with the host.

use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::bridge::{CaptureEvent, NotificationBridge};
use crate::sync::{SharedContainerSynchronizer, SyncOutcome};

use super::host::{CaptureHost, HostCompletion};
use super::CaptureState;

/// What a start/stop call did
#[derive(Debug)]
pub enum Transition {
    /// Idle -> Recording, host start initiated
    Started,
    /// Already Recording; nothing happened
    AlreadyRecording,
    /// Recording -> Idle, host stop initiated, artifacts handed off
    Stopped(SyncOutcome),
    /// Already Idle; nothing happened
    AlreadyIdle,
}

pub struct CaptureLifecycle {
    state: Mutex<CaptureState>,
    host: Arc<dyn CaptureHost>,
    synchronizer: Arc<SharedContainerSynchronizer>,
    artifact_path: String,
    bridge: NotificationBridge,
}

impl CaptureLifecycle {
    pub fn new(
        host: Arc<dyn CaptureHost>,
        synchronizer: Arc<SharedContainerSynchronizer>,
        artifact_path: impl Into<String>,
        bridge: NotificationBridge,
    ) -> Self {
        Self {
            state: Mutex::new(CaptureState::Idle),
            host,
            synchronizer,
            artifact_path: artifact_path.into(),
            bridge,
        }
    }

    /// Requested capture state
    pub fn state(&self) -> CaptureState {
        *self.lock_state()
    }

    /// Request capture. Idempotent while Recording. Does not wait for the
    /// host; must be called within a tokio runtime.
    pub fn start(&self) -> Transition {
        {
            let mut state = self.lock_state();
            if *state == CaptureState::Recording {
                info!("Capture already requested");
                return Transition::AlreadyRecording;
            }
            *state = CaptureState::Recording;
        }

        info!("Starting capture...");
        if let Err(e) = self.host.activate_extension() {
            warn!("Failed to activate capture extension: {}", e);
            self.bridge.emit_event(&CaptureEvent::Error {
                message: e.to_string(),
            });
        }

        self.spawn_completion("start", self.host.start(), CaptureEvent::CaptureStarted);
        Transition::Started
    }

    /// Request stop, then hand off whatever the extension has written so
    /// far. Idempotent while Idle: no host call and no sync.
    pub async fn stop(&self) -> Transition {
        {
            let mut state = self.lock_state();
            if *state == CaptureState::Idle {
                info!("No capture in progress");
                return Transition::AlreadyIdle;
            }
            *state = CaptureState::Idle;
        }

        info!("Stopping capture...");
        self.spawn_completion("stop", self.host.stop(), CaptureEvent::CaptureStopped);

        // The extension may still be flushing; this copies what is there now
        let outcome = self.synchronizer.sync(&self.artifact_path).await;
        Transition::Stopped(outcome)
    }

    fn spawn_completion(
        &self,
        what: &'static str,
        completion: HostCompletion,
        on_success: CaptureEvent,
    ) {
        let bridge = self.bridge.clone();
        tokio::spawn(async move {
            match completion.await {
                Ok(()) => {
                    info!("Host capture {} completed", what);
                    bridge.emit_event(&on_success);
                }
                Err(e) => {
                    warn!("Host capture {} failed: {}", what, e);
                    bridge.emit_event(&CaptureEvent::Error {
                        message: e.to_string(),
                    });
                }
            }
        });
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CaptureState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
