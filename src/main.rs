//! capture-coordinator
//!
//! Serves the capture channel over stdio: one command per stdin line
//! (`startCapture`, `stopCapture`, `setConfig <json>`), one JSON reply per
//! command on stdout, interleaved with `notify` event lines.

use anyhow::Result;
use serde_json::json;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use capture_coordinator::bridge::ui_context;
use capture_coordinator::capture::{CaptureState, CommandHost};
use capture_coordinator::config::Settings;
use capture_coordinator::dispatch::{MethodCall, CAPTURE_CHANNEL, NOTIFY, STOP_CAPTURE};
use capture_coordinator::{logging, Coordinator};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let settings_path = args
        .iter()
        .position(|a| a == "--settings" || a == "-c")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    let settings = match settings_path {
        Some(path) => Settings::load_from(&path)?,
        None => Settings::load()?,
    };

    // Keep the handle alive so buffered log lines are flushed on exit
    let log = logging::init_logging(&settings.logging)?;
    info!("capture-coordinator starting...");
    info!("Logging to {:?} ({} old log file(s) pruned)", log.dir, log.pruned);
    info!("Settings loaded from {:?}", settings.settings_path()?);

    let runtime = tokio::runtime::Runtime::new()?;

    let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received, shutting down...");
        let _ = shutdown_tx.send(());
    })?;

    if let Err(e) = runtime.block_on(serve(settings, shutdown_rx)) {
        error!("Coordinator error: {}", e);
        return Err(e);
    }

    info!("Shutdown complete");
    Ok(())
}

/// Run the UI side: read commands, drain the UI context, write replies
async fn serve(settings: Settings, mut shutdown_rx: mpsc::UnboundedReceiver<()>) -> Result<()> {
    let host = Arc::new(CommandHost::new(settings.host.clone()));
    let coordinator = Coordinator::new(&settings, host);

    let (ui_ctx, mut ui_loop) = ui_context();
    coordinator.set_listener(ui_ctx, |payload| {
        write_line(&json!({ "event": NOTIFY, "payload": payload }));
    });

    let _watcher = if settings.watch.enabled {
        match coordinator.watch_artifacts() {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("Failed to watch shared artifacts: {}. Change events will not be sent.", e);
                None
            }
        }
    } else {
        None
    };

    let dispatcher = coordinator.dispatcher();
    let mut commands = spawn_stdin_reader();
    info!("Serving {} on stdin", CAPTURE_CHANNEL);

    loop {
        tokio::select! {
            line = commands.recv() => {
                let Some(line) = line else {
                    info!("Command channel closed");
                    break;
                };
                if let Some(call) = MethodCall::parse_line(&line) {
                    let method = call.method.clone();
                    let outcome = dispatcher.dispatch(call).await;
                    write_line(&json!({ "method": method, "outcome": outcome }));
                }
            }

            Some(job) = ui_loop.next_job() => job(),

            _ = shutdown_rx.recv() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    if coordinator.state() == CaptureState::Recording {
        info!("Stopping capture before exit");
        dispatcher.dispatch(MethodCall::new(STOP_CAPTURE, None)).await;
    }
    ui_loop.run_pending();

    Ok(())
}

/// Read stdin on a dedicated thread; the channel closes at EOF
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to read command: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

fn write_line(value: &serde_json::Value) {
    println!("{}", value);
}

fn print_help() {
    println!("capture-coordinator - Capture session coordinator");
    println!();
    println!("USAGE:");
    println!("    capture-coordinator [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help               Print this help message");
    println!("    -c, --settings <PATH>    Use settings file at PATH");
    println!();
    println!("COMMANDS (stdin, one per line):");
    println!("    startCapture");
    println!("    stopCapture");
    println!("    setConfig <json>");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG                        Set log level (e.g., debug, info, warn)");
    println!("    CAPTURE_COORDINATOR_LOG_PATH    Override the log directory");
}
