//! # skiff-backend - Backend Process Supervision
//!
//! Spawns and supervises the `streamlit run` child process that serves the
//! application UI, relaying its stdout/stderr/exit observations as
//! [`SupervisorEvent`](skiff_core::SupervisorEvent)s.
//!
//! Depends on [`skiff_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Process Management
//! - [`BackendProcess`] - Spawn and manage the streamlit child process
//! - [`Supervisor`] - Single-owner lifecycle: start / restart / shutdown
//!
//! ### Invocation
//! - [`LaunchSpec`] - What to launch (root, entry, port, theme)
//! - [`LaunchPlan`] - Materialized program + args + cwd + env overlay
//! - [`Theme`] - Presentation theme flags
//!
//! ### Resolution
//! - [`resolve_streamlit()`] - Ordered candidate probe with PATH fallback

pub mod launch;
pub mod process;
pub mod resolve;
pub mod supervisor;

// Public API re-exports
pub use launch::{LaunchPlan, LaunchSpec, Theme, DEFAULT_ENTRY, DEFAULT_HOST, DEFAULT_PORT};
pub use process::BackendProcess;
pub use resolve::{resolve_streamlit, STREAMLIT_OVERRIDE_ENV};
pub use supervisor::{Supervisor, TERMINATION_GRACE};
