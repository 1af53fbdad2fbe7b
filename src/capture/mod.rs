//! Capture lifecycle
//!
//! Start/stop of the recording session and the host primitives behind it.

mod host;
mod lifecycle;

pub use host::{CaptureHost, CommandHost, HostCompletion};
pub use lifecycle::{CaptureLifecycle, Transition};

#[cfg(test)]
pub(crate) use lifecycle::tests::FakeHost;

/// Requested capture state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    #[default]
    Idle,
    Recording,
}
