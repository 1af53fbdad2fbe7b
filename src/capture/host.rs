//! Host capture primitives
//!
//! The host recorder is driven through [`CaptureHost`]. Calling `start` or
//! `stop` initiates the operation immediately; the returned completion
//! resolves when the host reports back. Callers only log that result.

use futures::future::{self, BoxFuture, FutureExt};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::HostSettings;
use crate::error::HostError;

/// Completion of a host start/stop request
pub type HostCompletion = BoxFuture<'static, Result<(), HostError>>;

pub trait CaptureHost: Send + Sync {
    /// Ask the host to bring up the isolated capture extension. May show a
    /// system picker or permission prompt; does not wait for it.
    fn activate_extension(&self) -> Result<(), HostError> {
        Ok(())
    }

    /// Initiate capture
    fn start(&self) -> HostCompletion;

    /// Initiate stop
    fn stop(&self) -> HostCompletion;
}

/// Host backed by external commands, one argv per primitive.
/// A missing command reports [`HostError::Unavailable`].
pub struct CommandHost {
    settings: HostSettings,
}

impl CommandHost {
    pub fn new(settings: HostSettings) -> Self {
        Self { settings }
    }

    fn spawn(
        &self,
        what: &'static str,
        argv: Option<&Vec<String>>,
    ) -> Result<tokio::process::Child, HostError> {
        let argv = argv
            .ok_or_else(|| HostError::Unavailable(format!("no {} command configured", what)))?;
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| HostError::Unavailable(format!("{} command is empty", what)))?;

        debug!("Running host {} command: {:?}", what, argv);
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    HostError::PermissionDenied(format!("{}: {}", program, e))
                }
                std::io::ErrorKind::NotFound => {
                    HostError::Unavailable(format!("{}: {}", program, e))
                }
                _ => HostError::Failed(format!("{}: {}", program, e)),
            })
    }

    fn run(&self, what: &'static str, argv: Option<&Vec<String>>) -> HostCompletion {
        let mut child = match self.spawn(what, argv) {
            Ok(child) => child,
            Err(e) => return future::ready(Err(e)).boxed(),
        };

        async move {
            let status = child
                .wait()
                .await
                .map_err(|e| HostError::Failed(format!("{} command: {}", what, e)))?;
            if status.success() {
                Ok(())
            } else {
                Err(HostError::Failed(format!("{} command exited with {}", what, status)))
            }
        }
        .boxed()
    }
}

impl CaptureHost for CommandHost {
    fn activate_extension(&self) -> Result<(), HostError> {
        if self.settings.activate_command.is_none() {
            return Ok(());
        }
        // Activation completes through the extension itself; the command's
        // exit status is only logged
        let mut child = self.spawn("activate", self.settings.activate_command.as_ref())?;
        info!("Requested extension activation (pid {:?})", child.id());
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => debug!("Activation command finished"),
                Ok(status) => warn!("Activation command exited with {}", status),
                Err(e) => warn!("Failed to wait for activation command: {}", e),
            }
        });
        Ok(())
    }

    fn start(&self) -> HostCompletion {
        self.run("start", self.settings.start_command.as_ref())
    }

    fn stop(&self) -> HostCompletion {
        self.run("stop", self.settings.stop_command.as_ref())
    }
}
