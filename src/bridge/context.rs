//! UI execution context
//!
//! The UI boundary owns a single [`UiLoop`] and runs every job posted through
//! its [`UiContext`] handles, in posting order, on whatever task drives the
//! loop. Anything that must run "on the UI" goes through `post`.

use tokio::sync::mpsc;

/// A unit of work to run on the UI context
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Cloneable handle used to post jobs onto the UI context from any thread
#[derive(Clone)]
pub struct UiContext {
    tx: mpsc::UnboundedSender<Job>,
}

/// Receiving side of the UI context. Drive it from the UI task.
pub struct UiLoop {
    rx: mpsc::UnboundedReceiver<Job>,
}

/// Create a UI context and the loop that executes its jobs
pub fn ui_context() -> (UiContext, UiLoop) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UiContext { tx }, UiLoop { rx })
}

impl UiContext {
    /// Queue `job` behind everything already posted.
    /// Returns false if the loop has been dropped.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) -> bool {
        self.tx.send(Box::new(job)).is_ok()
    }
}

impl UiLoop {
    /// Wait for the next job. Returns `None` once every handle is dropped.
    pub async fn next_job(&mut self) -> Option<Job> {
        self.rx.recv().await
    }

    /// Run whatever is queued right now without waiting, returning how many
    /// jobs ran
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }
}
