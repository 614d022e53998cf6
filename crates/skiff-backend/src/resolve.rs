//! Streamlit executable resolution
//!
//! The backend is launched through the `streamlit` CLI, which may live in a
//! project virtualenv, a user install, or a system package. Resolution probes
//! an ordered list of candidate locations and only then falls back to the
//! shell's search path.

use std::path::{Path, PathBuf};

use skiff_core::prelude::*;

/// Environment variable that overrides resolution entirely
pub const STREAMLIT_OVERRIDE_ENV: &str = "SKIFF_STREAMLIT";

#[cfg(windows)]
const STREAMLIT_EXE: &str = "streamlit.exe";
#[cfg(not(windows))]
const STREAMLIT_EXE: &str = "streamlit";

/// Resolve the streamlit executable for the given app root.
///
/// Probe order:
/// 1. `SKIFF_STREAMLIT` env var (must point at an existing file)
/// 2. the app's own virtualenv (`.venv`)
/// 3. user-local install (`~/.local/bin`)
/// 4. common system prefixes
/// 5. the shell's `PATH`
pub fn resolve_streamlit(app_root: &Path) -> Result<PathBuf> {
    for candidate in candidate_paths(app_root) {
        if candidate.is_file() {
            debug!("Resolved streamlit at: {}", candidate.display());
            return Ok(candidate);
        }
    }

    which::which(STREAMLIT_EXE)
        .inspect(|path| debug!("Resolved streamlit via PATH: {}", path.display()))
        .map_err(|_| Error::StreamlitNotFound)
}

/// Ordered explicit candidate locations (PATH fallback not included)
fn candidate_paths(app_root: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(override_path) = std::env::var(STREAMLIT_OVERRIDE_ENV) {
        candidates.push(PathBuf::from(override_path));
    }

    #[cfg(windows)]
    candidates.push(app_root.join(".venv").join("Scripts").join(STREAMLIT_EXE));
    #[cfg(not(windows))]
    candidates.push(app_root.join(".venv").join("bin").join(STREAMLIT_EXE));

    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".local").join("bin").join(STREAMLIT_EXE));
    }

    #[cfg(not(windows))]
    {
        candidates.push(PathBuf::from("/usr/local/bin").join(STREAMLIT_EXE));
        candidates.push(PathBuf::from("/opt/homebrew/bin").join(STREAMLIT_EXE));
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_candidates_start_with_venv_without_override() {
        std::env::remove_var(STREAMLIT_OVERRIDE_ENV);
        let root = Path::new("/some/app");
        let candidates = candidate_paths(root);
        assert!(candidates[0].starts_with(root.join(".venv")));
    }

    #[test]
    #[serial]
    fn test_env_override_takes_priority() {
        std::env::set_var(STREAMLIT_OVERRIDE_ENV, "/custom/streamlit");
        let candidates = candidate_paths(Path::new("/some/app"));
        assert_eq!(candidates[0], PathBuf::from("/custom/streamlit"));
        std::env::remove_var(STREAMLIT_OVERRIDE_ENV);
    }

    #[test]
    #[serial]
    fn test_env_override_resolves_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("streamlit");
        std::fs::write(&fake, "#!/bin/sh\n").unwrap();

        std::env::set_var(STREAMLIT_OVERRIDE_ENV, &fake);
        let resolved = resolve_streamlit(Path::new("/nonexistent/app")).unwrap();
        assert_eq!(resolved, fake);
        std::env::remove_var(STREAMLIT_OVERRIDE_ENV);
    }

    #[test]
    #[serial]
    fn test_venv_candidate_resolves() {
        std::env::remove_var(STREAMLIT_OVERRIDE_ENV);

        let dir = tempfile::tempdir().unwrap();
        let bin = if cfg!(windows) {
            dir.path().join(".venv").join("Scripts")
        } else {
            dir.path().join(".venv").join("bin")
        };
        std::fs::create_dir_all(&bin).unwrap();
        let exe = bin.join(STREAMLIT_EXE);
        std::fs::write(&exe, "#!/bin/sh\n").unwrap();

        let resolved = resolve_streamlit(dir.path()).unwrap();
        assert_eq!(resolved, exe);
    }
}
