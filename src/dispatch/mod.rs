//! Command dispatcher
//!
//! The UI boundary speaks a fixed vocabulary on the capture channel. Known
//! commands are routed to the lifecycle or the config store; anything else
//! answers `NotImplemented`, which callers can tell apart from a failure.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::capture::CaptureLifecycle;
use crate::store::ConfigStore;

/// Name of the command channel registered with the UI boundary
pub const CAPTURE_CHANNEL: &str = "dev.capture_coordinator/capturing_channel";

pub const START_CAPTURE: &str = "startCapture";
pub const STOP_CAPTURE: &str = "stopCapture";
pub const SET_CONFIG: &str = "setConfig";

/// Event method name used for notifications going back to the UI
pub const NOTIFY: &str = "notify";

/// One call arriving on the capture channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub argument: Option<String>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, argument: Option<String>) -> Self {
        Self {
            method: method.into(),
            argument,
        }
    }

    /// Parse `method [argument]`. Everything after the first run of
    /// whitespace is the argument, verbatim. Returns `None` for blank lines.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match line.split_once(char::is_whitespace) {
            Some((method, rest)) => {
                let rest = rest.trim_start();
                let argument = (!rest.is_empty()).then(|| rest.to_string());
                Some(Self::new(method, argument))
            }
            None => Some(Self::new(line, None)),
        }
    }
}

/// Reply to a method call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum DispatchOutcome {
    Success,
    Failure { code: String, message: String },
    NotImplemented,
}

impl DispatchOutcome {
    fn failure(code: &str, message: impl Into<String>) -> Self {
        DispatchOutcome::Failure {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Clone)]
pub struct CommandDispatcher {
    lifecycle: Arc<CaptureLifecycle>,
    store: Arc<ConfigStore>,
}

impl CommandDispatcher {
    pub fn new(lifecycle: Arc<CaptureLifecycle>, store: Arc<ConfigStore>) -> Self {
        Self { lifecycle, store }
    }

    pub async fn dispatch(&self, call: MethodCall) -> DispatchOutcome {
        debug!(
            "Dispatching {} ({} byte argument)",
            call.method,
            call.argument.as_ref().map_or(0, String::len)
        );

        match call.method.as_str() {
            START_CAPTURE => {
                self.lifecycle.start();
                DispatchOutcome::Success
            }
            STOP_CAPTURE => {
                self.lifecycle.stop().await;
                DispatchOutcome::Success
            }
            SET_CONFIG => {
                let Some(blob) = call.argument else {
                    return DispatchOutcome::failure(
                        "MissingArgument",
                        "setConfig needs a config blob",
                    );
                };
                match self.store.set_config(&blob).await {
                    // The destination is adopted but the extension never saw the blob
                    Ok(update) if !update.persisted => DispatchOutcome::failure(
                        "PersistError",
                        "config could not be written to the shared container",
                    ),
                    Ok(_) => DispatchOutcome::Success,
                    Err(e) => DispatchOutcome::failure("ConfigError", e.to_string()),
                }
            }
            other => {
                info!("Method not implemented: {}", other);
                DispatchOutcome::NotImplemented
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(MethodCall::parse_line("   "), None);
        assert_eq!(
            MethodCall::parse_line("startCapture\n"),
            Some(MethodCall::new("startCapture", None))
        );
        assert_eq!(
            MethodCall::parse_line(r#"setConfig  {"a": "b c"}"#),
            Some(MethodCall::new("setConfig", Some(r#"{"a": "b c"}"#.to_string())))
        );
    }

    #[test]
    fn test_outcome_wire_format() {
        assert_eq!(
            serde_json::to_string(&DispatchOutcome::Success).unwrap(),
            r#"{"result":"success"}"#
        );
        assert_eq!(
            serde_json::to_string(&DispatchOutcome::NotImplemented).unwrap(),
            r#"{"result":"notImplemented"}"#
        );
        assert_eq!(
            serde_json::to_string(&DispatchOutcome::failure("ConfigError", "bad")).unwrap(),
            r#"{"result":"failure","code":"ConfigError","message":"bad"}"#
        );
    }
}
