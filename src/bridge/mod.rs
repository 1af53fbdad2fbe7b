//! Notification bridge
//!
//! Carries `notify` messages from host callbacks, watcher threads and
//! background tasks to the single listener registered by the UI boundary.
//! Delivery always happens on the listener's [`UiContext`], in emit order.
//!
//! There is no buffering across registration: a message emitted while no
//! listener is registered is dropped.

mod context;
mod event;

pub use context::{ui_context, Job, UiContext, UiLoop};
pub use event::CaptureEvent;

use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Callback invoked with each `notify` payload
pub type Listener = Arc<dyn Fn(Option<String>) + Send + Sync>;

struct Registration {
    context: UiContext,
    listener: Listener,
}

#[derive(Clone, Default)]
pub struct NotificationBridge {
    registration: Arc<Mutex<Option<Registration>>>,
}

impl NotificationBridge {
    /// Register the listener, replacing any previous one. The listener is
    /// only ever called from jobs running on `context`.
    pub fn register(
        &self,
        context: UiContext,
        listener: impl Fn(Option<String>) + Send + Sync + 'static,
    ) {
        *self.lock() = Some(Registration {
            context,
            listener: Arc::new(listener),
        });
    }

    pub fn unregister(&self) {
        *self.lock() = None;
    }

    pub fn has_listener(&self) -> bool {
        self.lock().is_some()
    }

    /// Hand `message` to the listener's context. Safe to call from any
    /// thread. Returns false if the message was dropped.
    pub fn emit(&self, message: Option<String>) -> bool {
        // Posting while holding the lock keeps queue order equal to emit order
        let guard = self.lock();
        let Some(registration) = guard.as_ref() else {
            debug!("Dropping notification, no listener registered: {:?}", message);
            return false;
        };

        trace!("notify {:?}", message);
        let listener = registration.listener.clone();
        let posted = registration.context.post(move || listener(message));
        if !posted {
            debug!("Dropping notification, UI context is gone");
        }
        posted
    }

    pub fn emit_event(&self, event: &CaptureEvent) -> bool {
        match event.to_message() {
            Some(message) => self.emit(Some(message)),
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Registration>> {
        self.registration
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collecting_listener(
        bridge: &NotificationBridge,
        ctx: UiContext,
    ) -> Arc<Mutex<Vec<Option<String>>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bridge.register(ctx, move |message| sink.lock().unwrap().push(message));
        seen
    }

    #[test]
    fn test_emit_preserves_order() {
        let bridge = NotificationBridge::default();
        let (ctx, mut ui) = ui_context();
        let seen = collecting_listener(&bridge, ctx);

        assert!(bridge.emit(Some("a".to_string())));
        assert!(bridge.emit(Some("b".to_string())));
        assert!(bridge.emit(None));

        // Nothing is delivered until the UI context runs
        assert!(seen.lock().unwrap().is_empty());
        ui.run_pending();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some("a".to_string()), Some("b".to_string()), None]
        );
    }

    #[test]
    fn test_emit_without_listener_is_dropped() {
        let bridge = NotificationBridge::default();
        assert!(!bridge.emit(Some("lost".to_string())));

        let (ctx, mut ui) = ui_context();
        let seen = collecting_listener(&bridge, ctx);
        ui.run_pending();
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_listener_runs_on_ui_thread() {
        let bridge = NotificationBridge::default();
        let (ctx, mut ui) = ui_context();
        let threads = Arc::new(Mutex::new(Vec::new()));
        let sink = threads.clone();
        bridge.register(ctx, move |_| sink.lock().unwrap().push(std::thread::current().id()));

        let emitters: Vec<_> = (0..4)
            .map(|i| {
                let bridge = bridge.clone();
                std::thread::spawn(move || bridge.emit(Some(i.to_string())))
            })
            .collect();
        for emitter in emitters {
            assert!(emitter.join().unwrap());
        }

        assert_eq!(ui.run_pending(), 4);
        let ui_thread = std::thread::current().id();
        assert!(threads.lock().unwrap().iter().all(|id| *id == ui_thread));
    }

    #[test]
    fn test_unregister_stops_delivery() {
        let bridge = NotificationBridge::default();
        let (ctx, mut ui) = ui_context();
        let seen = collecting_listener(&bridge, ctx);

        bridge.emit_event(&CaptureEvent::CaptureStarted);
        bridge.unregister();
        assert!(!bridge.has_listener());
        assert!(!bridge.emit_event(&CaptureEvent::CaptureStopped));

        ui.run_pending();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some(r#"{"type":"onCaptureStarted"}"#.to_string())]
        );
    }
}
