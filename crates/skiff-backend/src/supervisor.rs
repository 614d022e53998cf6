//! Backend process supervisor
//!
//! Owns the single [`BackendProcess`] instance and sequences its lifecycle:
//! start, user-initiated restart, and teardown. At most one backend is live
//! per supervisor; a restart confirms (or forces) termination of the old
//! process before the new one is spawned, so the listen port has been
//! released by the time the replacement binds it.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::launch::{LaunchPlan, LaunchSpec};
use crate::process::BackendProcess;
use crate::resolve::resolve_streamlit;
use skiff_core::prelude::*;
use skiff_core::SupervisorEvent;

/// How long `restart()` waits for the old process to be reaped before
/// proceeding anyway.
pub const TERMINATION_GRACE: Duration = Duration::from_secs(2);

/// Supervises the backend child process.
///
/// Crash of the backend is surfaced as an `Exited` event and is NOT
/// retried automatically — restart is operator-initiated only.
pub struct Supervisor {
    spec: LaunchSpec,
    event_tx: mpsc::Sender<SupervisorEvent>,
    process: Option<BackendProcess>,
    grace: Duration,
}

impl Supervisor {
    pub fn new(spec: LaunchSpec, event_tx: mpsc::Sender<SupervisorEvent>) -> Self {
        Self {
            spec,
            event_tx,
            process: None,
            grace: TERMINATION_GRACE,
        }
    }

    /// Resolve the executable and spawn the backend.
    ///
    /// Resolution and spawn failures are reported downstream as a
    /// `SpawnFailed` event AND returned as a (recoverable) error; in both
    /// cases no process handle is retained.
    pub async fn start(&mut self) -> Result<()> {
        self.reap();
        if self.process.is_some() {
            return Err(Error::process("backend already running"));
        }

        let entry = self.spec.app_root.join(&self.spec.entry);
        if !entry.is_file() {
            let err = Error::NoEntryPoint { path: entry };
            self.report_spawn_failure(&err).await;
            return Err(err);
        }

        let program = match resolve_streamlit(&self.spec.app_root) {
            Ok(program) => program,
            Err(err) => {
                self.report_spawn_failure(&err).await;
                return Err(err);
            }
        };

        let plan = LaunchPlan::build(program, &self.spec);
        match BackendProcess::spawn(&plan, self.event_tx.clone()) {
            Ok(process) => {
                self.process = Some(process);
                Ok(())
            }
            Err(err) => {
                self.report_spawn_failure(&err).await;
                Err(err)
            }
        }
    }

    /// Terminate the current backend (if any) and start a new one.
    ///
    /// Termination is awaited up to the grace period; on timeout we log and
    /// proceed — the force-kill has already been issued and the OS will
    /// reap the old instance.
    pub async fn restart(&mut self) -> Result<()> {
        info!("Restart requested");
        if let Some(mut process) = self.process.take() {
            if !process.terminate(self.grace).await {
                warn!(
                    "Old backend (pid {:?}) not reaped within grace; starting replacement anyway",
                    process.id()
                );
            }
        }
        self.start().await
    }

    /// Tear down the backend on shell shutdown.
    ///
    /// Sends the kill signal without waiting for exit confirmation; the
    /// wait task and kill-on-drop reap the child.
    pub fn shutdown(&mut self) {
        if let Some(mut process) = self.process.take() {
            info!("Shutting down backend (pid {:?})", process.id());
            process.kill();
        }
    }

    /// Whether a backend process is currently live
    pub fn is_running(&mut self) -> bool {
        self.reap();
        self.process.is_some()
    }

    /// The endpoint the supervised backend serves on
    pub fn endpoint(&self) -> String {
        self.spec.endpoint()
    }

    /// Clear the handle if the wait task has observed the exit
    fn reap(&mut self) {
        if self.process.as_ref().is_some_and(|p| p.has_exited()) {
            debug!("Clearing exited backend handle");
            self.process = None;
        }
    }

    async fn report_spawn_failure(&self, err: &Error) {
        error!("Backend start failed: {}", err);
        let _ = self
            .event_tx
            .send(SupervisorEvent::spawn_failed(err.to_string()))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use skiff_core::EventKind;
    use std::path::PathBuf;

    /// Build a spec against a temp root with an entry script and a fake
    /// venv streamlit that runs the given shell script.
    fn fake_backend_spec(dir: &tempfile::TempDir, script: &str) -> LaunchSpec {
        let bin = dir.path().join(".venv").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let exe = bin.join("streamlit");
        std::fs::write(&exe, format!("#!/bin/sh\n{}\n", script)).unwrap();

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        std::fs::write(dir.path().join("main.py"), "import streamlit as st\n").unwrap();

        LaunchSpec::new(dir.path())
    }

    async fn next_matching<F>(rx: &mut mpsc::Receiver<SupervisorEvent>, mut pred: F) -> bool
    where
        F: FnMut(&SupervisorEvent) -> bool,
    {
        for _ in 0..50 {
            match tokio::time::timeout(Duration::from_millis(100), rx.recv()).await {
                Ok(Some(event)) if pred(&event) => return true,
                Ok(Some(_)) => continue,
                _ => continue,
            }
        }
        false
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_entry_point_reports_and_creates_no_handle() {
        // Fake venv streamlit but no entry script in the app root.
        let dir = tempfile::tempdir().unwrap();
        let spec = fake_backend_spec(&dir, "sleep 60");
        std::fs::remove_file(dir.path().join("main.py")).unwrap();
        let (tx, mut rx) = mpsc::channel(16);
        let mut supervisor = Supervisor::new(spec, tx);

        let err = supervisor.start().await.unwrap_err();
        assert!(matches!(err, Error::NoEntryPoint { .. }));
        assert!(err.is_recoverable());
        assert!(!supervisor.is_running());
        let reported =
            next_matching(&mut rx, |e| matches!(e.kind, EventKind::SpawnFailed { .. })).await;
        assert!(reported, "SpawnFailed event was not emitted");
    }

    #[tokio::test]
    #[serial]
    async fn test_failed_resolution_reports_and_creates_no_handle() {
        // App root with an entry script but no venv, no override. A dev
        // machine may still carry a real streamlit on PATH, so only the
        // failure branch is asserted.
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.py"), "import streamlit as st\n").unwrap();
        let (tx, mut rx) = mpsc::channel(16);
        let mut supervisor = Supervisor::new(LaunchSpec::new(dir.path()), tx);

        if let Err(err) = supervisor.start().await {
            assert!(err.is_recoverable());
            assert!(!supervisor.is_running());
            let reported =
                next_matching(&mut rx, |e| matches!(e.kind, EventKind::SpawnFailed { .. })).await;
            assert!(reported, "SpawnFailed event was not emitted");
        } else {
            // Environment has a real streamlit on PATH; the spawn itself
            // succeeded, which still respects the contract under test.
            supervisor.shutdown();
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_start_spawns_and_events_flow() {
        let dir = tempfile::tempdir().unwrap();
        let spec = fake_backend_spec(&dir, "echo booted; sleep 60");
        let (tx, mut rx) = mpsc::channel(32);
        let mut supervisor = Supervisor::new(spec, tx);

        supervisor.start().await.unwrap();
        assert!(supervisor.is_running());

        let found = next_matching(&mut rx, |e| {
            matches!(&e.kind, EventKind::Output { data } if data.contains("booted"))
        })
        .await;
        assert!(found, "stdout of the spawned backend was not relayed");

        supervisor.shutdown();
    }

    #[tokio::test]
    #[serial]
    async fn test_start_while_running_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let spec = fake_backend_spec(&dir, "sleep 60");
        let (tx, _rx) = mpsc::channel(16);
        let mut supervisor = Supervisor::new(spec, tx);

        supervisor.start().await.unwrap();
        let second = supervisor.start().await;
        assert!(matches!(second, Err(Error::Process { .. })));

        supervisor.shutdown();
    }

    #[tokio::test]
    #[serial]
    async fn test_restart_terminates_old_then_starts_new() {
        let dir = tempfile::tempdir().unwrap();
        let spec = fake_backend_spec(&dir, "echo pid-$$; sleep 60");
        let (tx, mut rx) = mpsc::channel(64);
        let mut supervisor = Supervisor::new(spec, tx);

        supervisor.start().await.unwrap();
        let first_booted = next_matching(&mut rx, |e| {
            matches!(&e.kind, EventKind::Output { data } if data.contains("pid-"))
        })
        .await;
        assert!(first_booted);

        supervisor.restart().await.unwrap();
        assert!(supervisor.is_running());

        // The old instance must have been reaped (Exited event) and the
        // new one must produce fresh output.
        let exited = next_matching(&mut rx, |e| matches!(e.kind, EventKind::Exited { .. })).await;
        assert!(exited, "old backend did not report Exited during restart");

        let resumed = next_matching(&mut rx, |e| {
            matches!(&e.kind, EventKind::Output { data } if data.contains("pid-"))
        })
        .await;
        assert!(resumed, "new backend output did not resume after restart");

        supervisor.shutdown();
    }

    #[tokio::test]
    #[serial]
    async fn test_handle_cleared_after_exit_and_start_succeeds_again() {
        let dir = tempfile::tempdir().unwrap();
        let spec = fake_backend_spec(&dir, "exit 7");
        let (tx, mut rx) = mpsc::channel(32);
        let mut supervisor = Supervisor::new(spec, tx);

        supervisor.start().await.unwrap();
        let exited =
            next_matching(&mut rx, |e| e.kind == EventKind::Exited { code: Some(7) }).await;
        assert!(exited);

        // Handle is cleared once the exit is observed, and a fresh start
        // creates a new one.
        assert!(!supervisor.is_running());
        supervisor.start().await.unwrap();

        supervisor.shutdown();
    }

    #[test]
    fn test_endpoint_comes_from_spec() {
        let (tx, _rx) = mpsc::channel(1);
        let mut spec = LaunchSpec::new(PathBuf::from("/app"));
        spec.port = 8765;
        let supervisor = Supervisor::new(spec, tx);
        assert_eq!(supervisor.endpoint(), "http://localhost:8765");
    }
}
