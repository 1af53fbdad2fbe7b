//! Notification payloads
//!
//! Every `notify` message produced by the coordinator is one of these,
//! JSON-encoded with a `type` tag.

use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CaptureEvent {
    /// Host confirmed the capture request
    #[serde(rename = "onCaptureStarted")]
    CaptureStarted,

    /// Host confirmed the stop request
    #[serde(rename = "onCaptureStopped")]
    CaptureStopped,

    /// A non-fatal failure in the host, config or sync path
    #[serde(rename = "onError")]
    Error { message: String },

    /// Something changed under the shared artifact path. This is a
    /// best-effort observation and says nothing about capture state.
    #[serde(rename = "onArtifactsChanged")]
    ArtifactsChanged {
        paths: Vec<String>,
        /// Unix milliseconds when the change was observed
        observed_at: i64,
    },

    /// A handoff copied artifacts into private storage
    #[serde(rename = "onArtifactsSynced")]
    ArtifactsSynced { files: usize, destination: String },
}

impl CaptureEvent {
    /// Encode as the string carried by a `notify` message
    pub fn to_message(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(message) => Some(message),
            Err(e) => {
                error!("Failed to encode notification {:?}: {}", self, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let message = CaptureEvent::CaptureStarted.to_message().unwrap();
        assert_eq!(message, r#"{"type":"onCaptureStarted"}"#);

        let message = CaptureEvent::Error {
            message: "denied".to_string(),
        }
        .to_message()
        .unwrap();
        assert_eq!(message, r#"{"type":"onError","message":"denied"}"#);
    }

    #[test]
    fn test_synced_event_decodes() {
        let event: CaptureEvent = serde_json::from_str(
            r#"{"type":"onArtifactsSynced","files":3,"destination":"/tmp/x/images"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            CaptureEvent::ArtifactsSynced {
                files: 3,
                destination: "/tmp/x/images".to_string()
            }
        );
    }
}
