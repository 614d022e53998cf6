//! Supervisor event definitions

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// What the supervisor observed on the backend process
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// Chunk of stdout data. Chunk boundaries are opaque: a chunk may
    /// split or merge logical lines.
    Output { data: String },

    /// Chunk of stderr data. Informational — the backend may keep running
    /// while emitting warnings here.
    ErrorOutput { data: String },

    /// The backend process terminated. `code` is `None` when the process
    /// was killed by a signal.
    Exited { code: Option<i32> },

    /// The backend could not be started (executable missing or OS-level
    /// spawn error). Reported, not fatal to the supervisor.
    SpawnFailed { reason: String },
}

/// A single observation from the Process Supervisor, delivered to the
/// Display Coordinator in per-stream emission order.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SupervisorEvent {
    #[serde(flatten)]
    pub kind: EventKind,
    pub at: DateTime<Local>,
}

impl SupervisorEvent {
    fn new(kind: EventKind) -> Self {
        Self {
            kind,
            at: Local::now(),
        }
    }

    pub fn output(data: impl Into<String>) -> Self {
        Self::new(EventKind::Output { data: data.into() })
    }

    pub fn error_output(data: impl Into<String>) -> Self {
        Self::new(EventKind::ErrorOutput { data: data.into() })
    }

    pub fn exited(code: Option<i32>) -> Self {
        Self::new(EventKind::Exited { code })
    }

    pub fn spawn_failed(reason: impl Into<String>) -> Self {
        Self::new(EventKind::SpawnFailed {
            reason: reason.into(),
        })
    }

    /// Check if this event reports a failure condition
    pub fn is_error(&self) -> bool {
        matches!(
            self.kind,
            EventKind::ErrorOutput { .. } | EventKind::SpawnFailed { .. }
        )
    }

    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        match &self.kind {
            EventKind::Output { data } => data.clone(),
            EventKind::ErrorOutput { data } => data.clone(),
            EventKind::Exited { code } => match code {
                Some(code) => format!("Backend process exited with code {}", code),
                None => "Backend process terminated by signal".to_string(),
            },
            EventKind::SpawnFailed { reason } => {
                format!("Failed to start backend: {}", reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_carry_payload() {
        let event = SupervisorEvent::output("hello\n");
        assert_eq!(
            event.kind,
            EventKind::Output {
                data: "hello\n".to_string()
            }
        );

        let event = SupervisorEvent::exited(Some(3));
        assert_eq!(event.kind, EventKind::Exited { code: Some(3) });
    }

    #[test]
    fn test_is_error() {
        assert!(SupervisorEvent::error_output("warn").is_error());
        assert!(SupervisorEvent::spawn_failed("ENOENT").is_error());
        assert!(!SupervisorEvent::output("ok").is_error());
        assert!(!SupervisorEvent::exited(Some(0)).is_error());
    }

    #[test]
    fn test_summary_for_signal_termination() {
        let event = SupervisorEvent::exited(None);
        assert_eq!(event.summary(), "Backend process terminated by signal");
    }

    #[test]
    fn test_serializes_with_tagged_kind() {
        let event = SupervisorEvent::exited(Some(0));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""kind":"exited""#));
        assert!(json.contains(r#""code":0"#));
        assert!(json.contains(r#""at":"#));
    }
}
