//! Display coordinator: surface state machine and event loop
//!
//! Owns the single visible surface and its relationship to the backend's
//! readiness. Shows the placeholder immediately, attempts attachment after
//! the startup delay, falls back to the placeholder and retries with capped
//! exponential backoff on load failure, relays supervisor events to the
//! surface, and forwards user restart requests to the supervisor.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use url::Url;

use crate::config::RetrySettings;
use crate::surface::{Surface, SurfaceSignal};
use skiff_backend::Supervisor;
use skiff_core::prelude::*;
use skiff_core::{is_ready_marker, EventKind, Notification, SupervisorEvent};

/// Connection state of the display surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    /// Showing the static local page, backend not yet probed
    Placeholder,
    /// An attachment attempt is in flight
    Connecting,
    /// The surface is showing the backend endpoint
    Attached,
    /// The last attachment attempt failed; placeholder is shown again
    Failed,
}

/// Attachment retry schedule: exponential backoff with a cap, optionally
/// bounded by a maximum attempt count.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    initial: Duration,
    max: Duration,
    max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn new(initial: Duration, max: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            initial,
            max,
            max_attempts,
        }
    }

    /// Delay before retry number `attempt` (0-based): initial * 2^attempt,
    /// capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.initial.saturating_mul(factor).min(self.max)
    }

    /// Whether `failures` failed attempts exhaust the policy
    pub fn exhausted(&self, failures: u32) -> bool {
        self.max_attempts.is_some_and(|max| failures >= max)
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self::new(
            settings.initial_delay(),
            settings.max_delay(),
            settings.max_attempts,
        )
    }
}

/// Why the single pending timer is armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingTimer {
    /// Initial (or post-restart) startup delay before the first attach
    StartupDelay,
    /// Backoff delay before another attach attempt
    Retry,
}

/// Outcome of handling one signal
enum Flow {
    Continue,
    Shutdown,
}

/// Drives one [`Surface`] against one [`Supervisor`].
///
/// Single-threaded event loop: supervisor events, surface signals, and the
/// one pending timer are multiplexed with `select!`. Arming a timer
/// replaces any previously pending one, so a restart cannot leave a stale
/// retry attempt behind.
pub struct Coordinator<S: Surface> {
    surface: S,
    supervisor: Supervisor,
    events: mpsc::Receiver<SupervisorEvent>,
    signals: mpsc::Receiver<SurfaceSignal>,
    endpoint: Url,
    state: SurfaceState,
    startup_delay: Duration,
    retry: RetryPolicy,
    /// Consecutive failed attachment attempts since the last success or
    /// restart
    failures: u32,
    /// The single pending timer slot
    pending: Option<(PendingTimer, Instant)>,
}

impl<S: Surface> Coordinator<S> {
    pub fn new(
        surface: S,
        supervisor: Supervisor,
        events: mpsc::Receiver<SupervisorEvent>,
        signals: mpsc::Receiver<SurfaceSignal>,
        startup_delay: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let endpoint = Url::parse(&supervisor.endpoint())
            .map_err(|e| Error::config(format!("invalid endpoint: {}", e)))?;
        Ok(Self {
            surface,
            supervisor,
            events,
            signals,
            endpoint,
            state: SurfaceState::Placeholder,
            startup_delay,
            retry,
            failures: 0,
            pending: None,
        })
    }

    pub fn state(&self) -> SurfaceState {
        self.state
    }

    /// Start the backend and run the event loop until the surface closes.
    pub async fn run(mut self) -> Result<()> {
        self.surface.show_placeholder();
        self.notify(Notification::UpdateStatus(
            "Waiting for Python backend...".to_string(),
        ));

        // A start failure is already reported downstream as a SpawnFailed
        // event; the loop stays up so the user can fix the environment and
        // restart.
        if let Err(err) = self.supervisor.start().await {
            warn!("Initial backend start failed: {}", err);
        }

        self.arm(PendingTimer::StartupDelay, self.startup_delay);

        loop {
            let deadline = self.pending.map(|(_, when)| when);
            tokio::select! {
                event = self.events.recv() => {
                    match event {
                        Some(event) => self.relay(event),
                        None => {
                            // All supervisor senders gone; nothing left to
                            // supervise.
                            warn!("Supervisor event channel closed");
                            self.supervisor.shutdown();
                            return Err(Error::ChannelClosed);
                        }
                    }
                }
                signal = self.signals.recv() => {
                    let signal = signal.unwrap_or(SurfaceSignal::Closed);
                    if let Flow::Shutdown = self.handle_signal(signal).await {
                        break;
                    }
                }
                _ = async {
                    match deadline {
                        Some(when) => tokio::time::sleep_until(when).await,
                        None => std::future::pending().await,
                    }
                } => {
                    self.pending = None;
                    self.attempt_attach();
                }
            }
        }

        self.supervisor.shutdown();
        Ok(())
    }

    /// Forward a supervisor event to the surface on its bridge channel
    pub fn relay(&mut self, event: SupervisorEvent) {
        match &event.kind {
            EventKind::Output { data } => {
                let ready = is_ready_marker(data);
                self.notify(Notification::PythonOutput(data.clone()));
                if ready {
                    self.notify(Notification::UpdateStatus(
                        "Python backend running".to_string(),
                    ));
                }
            }
            EventKind::ErrorOutput { data } => {
                self.notify(Notification::PythonError(data.clone()));
            }
            EventKind::Exited { .. } => {
                self.notify(Notification::PythonOutput(event.summary()));
                self.notify(Notification::UpdateStatus("Python backend stopped".to_string()));
            }
            EventKind::SpawnFailed { .. } => {
                self.notify(Notification::PythonError(event.summary()));
                self.notify(Notification::UpdateStatus(
                    "Error in Python backend".to_string(),
                ));
            }
        }
    }

    async fn handle_signal(&mut self, signal: SurfaceSignal) -> Flow {
        match signal {
            SurfaceSignal::LoadFinished => {
                if self.state == SurfaceState::Connecting {
                    info!("Attached to backend at {}", self.endpoint);
                    self.state = SurfaceState::Attached;
                    self.failures = 0;
                    self.pending = None;
                    self.notify(Notification::UpdateStatus(
                        "Attached to Python backend".to_string(),
                    ));
                }
                Flow::Continue
            }
            SurfaceSignal::LoadFailed { reason } => {
                // Load outcomes are only meaningful for the attempt in
                // flight; a stale failure must not demote an attached
                // surface or perturb the retry schedule.
                if self.state == SurfaceState::Connecting {
                    self.on_load_failed(&reason);
                } else {
                    debug!("Ignoring stale load failure: {}", reason);
                }
                Flow::Continue
            }
            SurfaceSignal::RestartRequested => {
                self.forward_restart_request().await;
                Flow::Continue
            }
            SurfaceSignal::Closed => {
                info!("Surface closed, shutting down");
                Flow::Shutdown
            }
        }
    }

    /// Instruct the surface to load the backend endpoint
    fn attempt_attach(&mut self) {
        debug!(
            "Attachment attempt {} toward {}",
            self.failures + 1,
            self.endpoint
        );
        self.state = SurfaceState::Connecting;
        self.surface.load_url(&self.endpoint);
    }

    /// Fall back to the placeholder and schedule the next attempt (or park
    /// in Failed when the policy is exhausted)
    fn on_load_failed(&mut self, reason: &str) {
        debug!("Attachment failed: {}", reason);
        self.state = SurfaceState::Failed;
        self.surface.show_placeholder();
        self.failures += 1;

        if self.retry.exhausted(self.failures) {
            warn!(
                "Giving up after {} attachment attempts; waiting for manual restart",
                self.failures
            );
            self.pending = None;
            self.notify(Notification::UpdateStatus(
                "Backend unreachable; restart to try again".to_string(),
            ));
        } else {
            let delay = self.retry.delay_for(self.failures - 1);
            debug!("Next attachment attempt in {:?}", delay);
            self.arm(PendingTimer::Retry, delay);
        }
    }

    /// User-initiated restart: reset the attach cycle, bounce the backend,
    /// and go back through the startup delay.
    async fn forward_restart_request(&mut self) {
        self.notify(Notification::UpdateStatus(
            "Restarting Python backend...".to_string(),
        ));
        self.state = SurfaceState::Placeholder;
        self.surface.show_placeholder();
        self.failures = 0;

        if let Err(err) = self.supervisor.restart().await {
            // Already reported as a SpawnFailed event; keep the loop alive.
            warn!("Restart failed: {}", err);
        }

        self.arm(PendingTimer::StartupDelay, self.startup_delay);
    }

    /// Arm the single timer slot, replacing whatever was pending
    fn arm(&mut self, timer: PendingTimer, delay: Duration) {
        self.pending = Some((timer, Instant::now() + delay));
    }

    fn notify(&mut self, note: Notification) {
        self.surface.notify(note);
    }
}
