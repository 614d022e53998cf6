//! Backend child process management

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Notify};

use crate::launch::LaunchPlan;
use skiff_core::prelude::*;
use skiff_core::SupervisorEvent;

/// Size of the stream read buffer. Chunk boundaries are opaque to
/// consumers, so the exact size only affects event granularity.
const READ_BUF_SIZE: usize = 4096;

/// Manages a single backend child process.
///
/// The `Child` handle is moved into a dedicated `wait_for_exit` background
/// task that calls `child.wait()`. This ensures the real exit code is
/// captured and emitted as `SupervisorEvent::exited(Some(N))` rather than
/// always `None`.
///
/// `BackendProcess` retains a kill channel ([`kill_tx`]) to request a
/// force-kill, an atomic flag ([`exited`]) for synchronous `has_exited()`
/// checks, and a [`Notify`] handle so [`terminate`](Self::terminate) can
/// await exit without holding a lock across `.await`.
pub struct BackendProcess {
    /// Process ID for logging
    pid: Option<u32>,
    /// One-shot sender that tells the wait task to force-kill the process.
    /// Consumed on first use (or on drop).
    kill_tx: Option<oneshot::Sender<()>>,
    /// Set to `true` by the wait task once the child has exited.
    exited: Arc<AtomicBool>,
    /// Notified by the wait task immediately after the child exits.
    exit_notify: Arc<Notify>,
}

impl BackendProcess {
    /// Spawn the backend described by `plan`.
    ///
    /// Stream and exit events are sent to `event_tx` for the coordinator.
    pub fn spawn(plan: &LaunchPlan, event_tx: mpsc::Sender<SupervisorEvent>) -> Result<Self> {
        info!(
            "Spawning backend: {} {}",
            plan.program.display(),
            plan.args.join(" ")
        );

        let mut child = Command::new(&plan.program)
            .args(&plan.args)
            .current_dir(&plan.cwd)
            .envs(plan.env.iter().cloned())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true) // Critical: cleanup on drop
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::StreamlitNotFound
                } else {
                    Error::ProcessSpawn {
                        reason: e.to_string(),
                    }
                }
            })?;

        let pid = child.id();
        info!("Backend process started with PID: {:?}", pid);

        // Reader tasks own the stream halves; per-stream ordering is
        // preserved by each task's sequential sends.
        let stdout = child.stdout.take().expect("stdout was configured");
        tokio::spawn(Self::stdout_reader(stdout, event_tx.clone()));

        let stderr = child.stderr.take().expect("stderr was configured");
        tokio::spawn(Self::stderr_reader(stderr, event_tx.clone()));

        // Shared exit-state primitives
        let exited = Arc::new(AtomicBool::new(false));
        let exit_notify = Arc::new(Notify::new());

        // Kill channel: BackendProcess holds the sender, wait task holds
        // the receiver.
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        // Spawn the dedicated wait task — takes ownership of `child`.
        tokio::spawn(Self::wait_for_exit(
            child,
            kill_rx,
            event_tx,
            Arc::clone(&exited),
            Arc::clone(&exit_notify),
        ));

        Ok(Self {
            pid,
            kill_tx: Some(kill_tx),
            exited,
            exit_notify,
        })
    }

    /// Background task: owns `child`, waits for it to exit, emits the
    /// `Exited` event exactly once.
    ///
    /// Two ways the task can end:
    /// 1. The backend exits naturally — `child.wait()` resolves.
    /// 2. `kill_rx` fires — we kill the child first, then wait for it.
    async fn wait_for_exit(
        mut child: Child,
        kill_rx: oneshot::Receiver<()>,
        event_tx: mpsc::Sender<SupervisorEvent>,
        exited: Arc<AtomicBool>,
        exit_notify: Arc<Notify>,
    ) {
        let code: Option<i32> = tokio::select! {
            // Natural exit path
            result = child.wait() => {
                match result {
                    Ok(status) => {
                        info!("Backend process exited with status: {:?}", status);
                        status.code()
                    }
                    Err(e) => {
                        error!("Error waiting for backend process: {}", e);
                        None
                    }
                }
            }
            // Force-kill path: kill_tx was sent (by terminate or drop)
            _ = kill_rx => {
                info!("Kill signal received, terminating backend process");
                if let Err(e) = child.kill().await {
                    error!("Failed to kill backend process: {}", e);
                }
                match child.wait().await {
                    Ok(status) => {
                        info!("Backend process killed, exit status: {:?}", status);
                        status.code()
                    }
                    Err(e) => {
                        error!("Error waiting after kill: {}", e);
                        None
                    }
                }
            }
        };

        // Mark the process as exited and wake any waiters before sending
        // the event, so `has_exited()` is true before callers observe it.
        exited.store(true, Ordering::Release);
        exit_notify.notify_waiters();

        debug!("Sending Exited event, code: {:?}", code);
        let _ = event_tx.send(SupervisorEvent::exited(code)).await;
    }

    /// Read stdout chunks and send them as OUTPUT events.
    ///
    /// Does NOT emit the `Exited` event — that is the responsibility of
    /// the `wait_for_exit` task, which captures the real exit code.
    async fn stdout_reader(
        mut stdout: tokio::process::ChildStdout,
        tx: mpsc::Sender<SupervisorEvent>,
    ) {
        let mut buf = vec![0u8; READ_BUF_SIZE];
        loop {
            match stdout.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                    trace!("stdout: {}", chunk);
                    if tx.send(SupervisorEvent::output(chunk)).await.is_err() {
                        debug!("stdout channel closed");
                        break;
                    }
                }
                Err(e) => {
                    error!("Error reading backend stdout: {}", e);
                    break;
                }
            }
        }

        // Stdout EOF just means the pipe closed; the process may still be
        // shutting down. wait_for_exit emits Exited with the real code.
        info!("stdout reader finished, process likely exiting");
    }

    /// Read stderr chunks and send them as ERROR_OUTPUT events
    async fn stderr_reader(
        mut stderr: tokio::process::ChildStderr,
        tx: mpsc::Sender<SupervisorEvent>,
    ) {
        let mut buf = vec![0u8; READ_BUF_SIZE];
        loop {
            match stderr.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                    trace!("stderr: {}", chunk);
                    if tx.send(SupervisorEvent::error_output(chunk)).await.is_err() {
                        debug!("stderr channel closed");
                        break;
                    }
                }
                Err(e) => {
                    error!("Error reading backend stderr: {}", e);
                    break;
                }
            }
        }

        debug!("stderr reader finished");
    }

    /// Request termination and wait up to `grace` for the child to be
    /// reaped.
    ///
    /// Returns `true` if the exit was confirmed within the grace period.
    /// A new process must not be spawned before this returns, otherwise
    /// the old instance may still hold the listen port.
    pub async fn terminate(&mut self, grace: Duration) -> bool {
        // Fast path: already dead.
        if self.has_exited() {
            info!("Backend already exited, nothing to terminate");
            return true;
        }

        // Take the sender first: `notified()` borrows self, so the kill
        // signal must go through the local handle.
        let kill_tx = self.kill_tx.take();

        // Race-free pattern: create the `notified()` future BEFORE sending
        // the kill signal and re-checking, so we cannot miss a notification
        // that fires between the check and the await (`notify_waiters`
        // wakes futures created before the call even if not yet polled).
        let notified = self.exit_notify.notified();

        if let Some(tx) = kill_tx {
            // Ignore send error — the wait task may have already exited.
            let _ = tx.send(());
        }
        if self.has_exited() {
            return true;
        }

        match tokio::time::timeout(grace, notified).await {
            Ok(()) => {
                info!("Backend process terminated within grace period");
                true
            }
            Err(_) => {
                warn!("Timed out waiting for backend to exit after kill");
                false
            }
        }
    }

    /// Send the kill signal to the wait task without waiting for exit.
    ///
    /// The wait task calls `child.kill()` and then `child.wait()`, ensuring
    /// the OS reaps the process before emitting the `Exited` event.
    pub fn kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            // Ignore send error — the wait task may have already exited.
            let _ = tx.send(());
        }
    }

    /// Check if the process has already exited.
    ///
    /// Non-blocking, synchronous check backed by an atomic flag that is
    /// set by the `wait_for_exit` task.
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    /// Check if the process is still running
    pub fn is_running(&self) -> bool {
        !self.has_exited()
    }

    /// Get the process ID
    pub fn id(&self) -> Option<u32> {
        self.pid
    }
}

impl Drop for BackendProcess {
    fn drop(&mut self) {
        if !self.has_exited() {
            warn!("BackendProcess dropped while process may still be running");
            // Send the kill signal so the wait task tears down the child
            // cleanly. No-op if terminate() already consumed it.
            if let Some(tx) = self.kill_tx.take() {
                let _ = tx.send(());
            }
        }
        // kill_on_drop(true) on the Child is the final safety net if the
        // wait task hasn't had a chance to handle the kill yet.
        debug!("BackendProcess dropped");
    }
}
