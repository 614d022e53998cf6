//! The display surface seam
//!
//! Rendering is external to this repository: the coordinator only needs a
//! sink for notifications and load instructions ([`Surface`]) and a stream
//! of signals coming back ([`SurfaceSignal`]). The shipped implementation,
//! [`StdoutSurface`], writes NDJSON lines to stdout and reads commands from
//! stdin, so any host (a webview shell, a test harness, a terminal) can sit
//! on the other side of the pipe.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use url::Url;

use skiff_core::prelude::*;
use skiff_core::{Notification, RESTART_COMMAND};

/// How long a single attachment probe may take before it counts as a
/// load failure.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Signals flowing from the surface back to the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceSignal {
    /// The endpoint load completed without a failure signal
    LoadFinished,

    /// The endpoint load failed; the coordinator falls back to the
    /// placeholder and schedules a retry
    LoadFailed { reason: String },

    /// User asked for the backend to be restarted
    RestartRequested,

    /// The surface is gone; the shell should shut down
    Closed,
}

impl SurfaceSignal {
    /// Parse an inbound command line from the surface.
    ///
    /// `restart-python` is the wire command name; bare `restart` is
    /// accepted as a convenience when driving the shell by hand.
    pub fn parse_command(line: &str) -> Option<Self> {
        match line.trim() {
            RESTART_COMMAND | "restart" => Some(SurfaceSignal::RestartRequested),
            "" => None,
            other => {
                debug!("Ignoring unknown surface command: {}", other);
                None
            }
        }
    }
}

/// What the coordinator can ask of a display surface
#[cfg_attr(test, mockall::automock)]
pub trait Surface: Send {
    /// Show the static local placeholder page
    fn show_placeholder(&mut self);

    /// Begin loading the backend endpoint; the result comes back as a
    /// `LoadFinished` or `LoadFailed` signal
    fn load_url(&mut self, url: &Url);

    /// Deliver a structured notification. Best-effort: a surface may drop
    /// status text without affecting supervision.
    fn notify(&mut self, note: Notification);
}

/// NDJSON surface over stdout/stdin.
///
/// Notifications are emitted one JSON object per line
/// (`{"channel": ..., "payload": ...}`); `load_url` is implemented as a
/// TCP connect probe against the endpoint,
/// since there is no real renderer on the other side to report a page
/// load result.
pub struct StdoutSurface {
    signal_tx: mpsc::Sender<SurfaceSignal>,
    probe_timeout: Duration,
}

impl StdoutSurface {
    pub fn new(signal_tx: mpsc::Sender<SurfaceSignal>) -> Self {
        Self {
            signal_tx,
            probe_timeout: PROBE_TIMEOUT,
        }
    }

    /// Spawn the stdin command listener. Lines become signals; EOF means
    /// the host closed the pipe and the shell should wind down.
    pub fn spawn_command_listener(signal_tx: mpsc::Sender<SurfaceSignal>) {
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(signal) = SurfaceSignal::parse_command(&line) {
                    if signal_tx.send(signal).await.is_err() {
                        break;
                    }
                }
            }
            debug!("stdin closed, signalling surface close");
            let _ = signal_tx.send(SurfaceSignal::Closed).await;
        });
    }

    fn emit_line(line: &str) {
        // Stdout is the bridge; diagnostics go to the tracing log instead.
        println!("{}", line);
    }
}

impl Surface for StdoutSurface {
    fn show_placeholder(&mut self) {
        Self::emit_line(r#"{"surface":"placeholder"}"#);
    }

    fn load_url(&mut self, url: &Url) {
        Self::emit_line(&format!(r#"{{"surface":"loading","url":"{}"}}"#, url));

        let host = url.host_str().unwrap_or("localhost").to_string();
        let port = url.port_or_known_default().unwrap_or(80);
        let timeout = self.probe_timeout;
        let tx = self.signal_tx.clone();

        // The probe must not block the coordinator loop; each attempt is
        // its own task and reports back as a signal.
        tokio::spawn(async move {
            let attempt = TcpStream::connect((host.as_str(), port));
            let signal = match tokio::time::timeout(timeout, attempt).await {
                Ok(Ok(_stream)) => SurfaceSignal::LoadFinished,
                Ok(Err(e)) => SurfaceSignal::LoadFailed {
                    reason: e.to_string(),
                },
                Err(_) => SurfaceSignal::LoadFailed {
                    reason: format!("connect timed out after {:?}", timeout),
                },
            };
            let _ = tx.send(signal).await;
        });
    }

    fn notify(&mut self, note: Notification) {
        Self::emit_line(&note.to_line());
    }
}
