//! Settings parser for .skiff/config.toml

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use skiff_backend::launch::{LaunchSpec, Theme, DEFAULT_ENTRY, DEFAULT_HOST, DEFAULT_PORT};
use skiff_core::prelude::*;

const CONFIG_FILENAME: &str = "config.toml";
const SKIFF_DIR: &str = ".skiff";

/// Shell settings, loaded from `<app_root>/.skiff/config.toml`.
///
/// Every field has a default, and a missing config file yields the
/// defaults — a bare checkout must run without any setup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Settings {
    /// Entry script, relative to the app root
    pub entry: PathBuf,

    /// Backend host; the endpoint is always local
    pub host: String,

    /// Backend listen port
    pub port: u16,

    /// Presentation theme forwarded to the backend as CLI flags
    pub theme: Theme,

    /// How long to wait after spawn before the first attachment attempt.
    /// The backend is assumed to be listening by then; failures fall into
    /// the retry cycle.
    pub startup_delay_ms: u64,

    /// Retry policy for attachment attempts
    pub retry: RetrySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            entry: PathBuf::from(DEFAULT_ENTRY),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            theme: Theme::default(),
            startup_delay_ms: default_startup_delay_ms(),
            retry: RetrySettings::default(),
        }
    }
}

/// Attachment retry policy: exponential backoff with a cap, and an
/// optional attempt limit after which the coordinator waits for a manual
/// restart instead of probing forever.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct RetrySettings {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: Option<u32>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 15_000,
            max_attempts: None,
        }
    }
}

fn default_startup_delay_ms() -> u64 {
    2_000
}

impl Settings {
    /// Load settings for an app root, falling back to defaults when no
    /// config file exists. A present-but-malformed file is an error: a
    /// silently ignored typo in the port would attach to the wrong thing.
    pub fn load(app_root: &Path) -> Result<Self> {
        let path = app_root.join(SKIFF_DIR).join(CONFIG_FILENAME);
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)?;
        let settings: Settings = toml::from_str(&raw).map_err(|e| Error::ConfigInvalid {
            message: format!("{}: {}", path.display(), e),
        })?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// The launch spec for the supervisor
    pub fn launch_spec(&self, app_root: &Path) -> LaunchSpec {
        let mut spec = LaunchSpec::new(app_root);
        spec.entry = self.entry.clone();
        spec.host = self.host.clone();
        spec.port = self.port;
        spec.theme = self.theme.clone();
        spec
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }
}

impl RetrySettings {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}
