//! skiff library
//!
//! Wires the process supervisor and the display coordinator together
//! around the stdout/stdin surface. The binary entry point stays thin.

use std::path::Path;

use tokio::sync::mpsc;

use skiff_backend::Supervisor;
use skiff_core::prelude::*;
use skiff_shell::{Coordinator, RetryPolicy, Settings, StdoutSurface, SurfaceSignal};

/// Channel capacity for supervisor events. Bounded so a runaway backend
/// applies backpressure to its own reader tasks instead of growing memory.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Channel capacity for surface signals (load results, user commands)
const SIGNAL_CHANNEL_CAPACITY: usize = 16;

/// Run the shell for the app rooted at `app_root` until the surface
/// closes or ctrl-c arrives.
pub async fn run(app_root: &Path, port_override: Option<u16>) -> Result<()> {
    let mut settings = Settings::load(app_root)?;
    if let Some(port) = port_override {
        settings.port = port;
    }

    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (signal_tx, signal_rx) = mpsc::channel::<SurfaceSignal>(SIGNAL_CHANNEL_CAPACITY);

    let supervisor = Supervisor::new(settings.launch_spec(app_root), event_tx);

    StdoutSurface::spawn_command_listener(signal_tx.clone());
    let surface = StdoutSurface::new(signal_tx);

    let coordinator = Coordinator::new(
        surface,
        supervisor,
        event_rx,
        signal_rx,
        settings.startup_delay(),
        RetryPolicy::from(&settings.retry),
    )?;

    tokio::select! {
        result = coordinator.run() => result,
        _ = tokio::signal::ctrl_c() => {
            // Dropping the coordinator drops the supervisor; the backend
            // is reaped through the kill channel and kill_on_drop.
            info!("Interrupted, shutting down");
            Ok(())
        }
    }
}
