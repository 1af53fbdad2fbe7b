//! Capture session coordinator
//!
//! Coordinates a screen-recording session split between a foreground
//! process and a sandboxed capture extension. The two sides share no memory
//! and talk only through a shared container on disk and a narrow command
//! channel:
//!
//! - [`dispatch`] routes `startCapture`, `stopCapture` and `setConfig`
//! - [`capture`] tracks the requested capture state and drives the host
//! - [`store`] adopts config blobs and hands them to the extension
//! - [`sync`] copies artifacts out of the shared container
//! - [`bridge`] delivers `notify` events on the UI's execution context

pub mod bridge;
pub mod capture;
pub mod config;
pub mod container;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod store;
pub mod sync;
pub mod watch;

pub use coordinator::Coordinator;
