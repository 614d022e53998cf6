//! Bridge message types between the supervisor side and the display surface
//!
//! The surface is an external sink: it receives one-directional
//! notifications on three named channels and sends back a single
//! one-directional command. Channel names are part of the external
//! interface and must not change:
//!
//! - `python-output` — backend stdout text
//! - `python-error` — backend stderr text
//! - `update-status` — user-visible status indicator text
//! - `restart-python` — (inbound) user-initiated backend restart

use serde::Serialize;

/// Inbound command channel name for user-initiated restart
pub const RESTART_COMMAND: &str = "restart-python";

/// Markers in backend stdout that indicate the server is up and serving.
///
/// Streamlit prints "You can now view your Streamlit app in your browser."
/// once it is listening; "Server running" is the legacy marker some
/// frontends matched on. Either flips the status indicator to running.
const READY_MARKERS: &[&str] = &["You can now view your Streamlit app", "Server running"];

/// Check whether a chunk of backend stdout contains the ready marker.
///
/// Chunk boundaries are opaque, so this is a plain substring match — the
/// marker may arrive merged with other lines.
pub fn is_ready_marker(data: &str) -> bool {
    READY_MARKERS.iter().any(|marker| data.contains(marker))
}

/// A notification forwarded from the coordinator to the display surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "channel", content = "payload")]
pub enum Notification {
    #[serde(rename = "python-output")]
    PythonOutput(String),

    #[serde(rename = "python-error")]
    PythonError(String),

    #[serde(rename = "update-status")]
    UpdateStatus(String),
}

impl Notification {
    /// The wire channel name this notification is delivered on
    pub fn channel(&self) -> &'static str {
        match self {
            Notification::PythonOutput(_) => "python-output",
            Notification::PythonError(_) => "python-error",
            Notification::UpdateStatus(_) => "update-status",
        }
    }

    /// The text payload
    pub fn payload(&self) -> &str {
        match self {
            Notification::PythonOutput(text)
            | Notification::PythonError(text)
            | Notification::UpdateStatus(text) => text,
        }
    }

    /// Serialize to a single NDJSON line (no trailing newline)
    pub fn to_line(&self) -> String {
        // Serialization of this enum cannot fail; fall back to the raw
        // payload if it somehow does.
        serde_json::to_string(self).unwrap_or_else(|_| self.payload().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names_match_wire_protocol() {
        assert_eq!(Notification::PythonOutput(String::new()).channel(), "python-output");
        assert_eq!(Notification::PythonError(String::new()).channel(), "python-error");
        assert_eq!(Notification::UpdateStatus(String::new()).channel(), "update-status");
        assert_eq!(RESTART_COMMAND, "restart-python");
    }

    #[test]
    fn test_to_line_is_single_json_line() {
        let note = Notification::UpdateStatus("running".to_string());
        let line = note.to_line();
        assert!(!line.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["channel"], "update-status");
        assert_eq!(value["payload"], "running");
    }

    #[test]
    fn test_ready_marker_detection() {
        assert!(is_ready_marker(
            "\n  You can now view your Streamlit app in your browser.\n"
        ));
        assert!(is_ready_marker("Server running on port 8501"));
        assert!(!is_ready_marker("Collecting usage statistics."));
    }

    #[test]
    fn test_ready_marker_survives_chunk_merging() {
        // Two logical lines arriving as one chunk
        let chunk = "some earlier line\nYou can now view your Streamlit app in your browser.";
        assert!(is_ready_marker(chunk));
    }
}
