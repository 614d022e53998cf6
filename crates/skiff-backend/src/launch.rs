//! Backend invocation: argument list and environment overlay
//!
//! The invocation surface is fixed: `streamlit run <entry>` in headless mode
//! on a known local port, with the app's presentation theme passed as CLI
//! flags and an environment overlay that forces unbuffered output (so stream
//! events arrive as they are printed, not in page-sized bursts).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default backend listen port
pub const DEFAULT_PORT: u16 = 8501;

/// Default backend host
pub const DEFAULT_HOST: &str = "localhost";

/// Default entry script relative to the app root
pub const DEFAULT_ENTRY: &str = "main.py";

/// Presentation theme parameters forwarded to streamlit as CLI flags
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Theme {
    pub primary_color: String,
    pub background_color: String,
    pub secondary_background_color: String,
    pub text_color: String,
    pub font: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_color: "#4285F4".to_string(),
            background_color: "#f5f5f5".to_string(),
            secondary_background_color: "#ffffff".to_string(),
            text_color: "#333333".to_string(),
            font: "sans-serif".to_string(),
        }
    }
}

/// What to launch: everything except the resolved executable path,
/// which is probed at spawn time (the environment may change between
/// restarts).
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Application root; becomes the child's working directory
    pub app_root: PathBuf,
    /// Entry script, relative to `app_root`
    pub entry: PathBuf,
    pub host: String,
    pub port: u16,
    pub theme: Theme,
}

impl LaunchSpec {
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        Self {
            app_root: app_root.into(),
            entry: PathBuf::from(DEFAULT_ENTRY),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            theme: Theme::default(),
        }
    }

    /// The local endpoint the backend will serve on
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// A fully materialized invocation: program, arguments, working directory,
/// and environment overlay.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

impl LaunchPlan {
    /// Build the invocation for a resolved streamlit executable
    pub fn build(program: PathBuf, spec: &LaunchSpec) -> Self {
        let args = vec![
            "run".to_string(),
            spec.entry.display().to_string(),
            "--server.headless=true".to_string(),
            format!("--browser.serverAddress={}", spec.host),
            format!("--server.port={}", spec.port),
            format!("--theme.primaryColor={}", spec.theme.primary_color),
            format!("--theme.backgroundColor={}", spec.theme.background_color),
            format!(
                "--theme.secondaryBackgroundColor={}",
                spec.theme.secondary_background_color
            ),
            format!("--theme.textColor={}", spec.theme.text_color),
            format!("--theme.font={}", spec.theme.font),
        ];

        Self {
            program,
            args,
            cwd: normalize_root(&spec.app_root),
            env: vec![
                // Without this Python block-buffers stdout when piped and
                // the ready banner arrives seconds late.
                ("PYTHONUNBUFFERED".to_string(), "1".to_string()),
                (
                    "SKIFF_APP_VERSION".to_string(),
                    env!("CARGO_PKG_VERSION").to_string(),
                ),
            ],
        }
    }
}

/// Canonicalize the app root where possible (dunce avoids UNC paths on
/// Windows); fall back to the path as given.
fn normalize_root(root: &Path) -> PathBuf {
    dunce::canonicalize(root).unwrap_or_else(|_| root.to_path_buf())
}
