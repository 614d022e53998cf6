//! # skiff-shell - Display Coordination
//!
//! Owns the display surface seam and the coordinator state machine that
//! attaches the surface to the supervised backend's endpoint.
//!
//! Depends on [`skiff_core`] for domain types and [`skiff_backend`] for the
//! process supervisor.
//!
//! ## Public API
//!
//! ### Coordination (`coordinator`)
//! - [`Coordinator`] - Event loop driving a surface against a supervisor
//! - [`SurfaceState`] - Placeholder / Connecting / Attached / Failed
//! - [`RetryPolicy`] - Capped exponential backoff for attachment attempts
//!
//! ### Surface seam (`surface`)
//! - [`Surface`] - What the coordinator asks of a display surface
//! - [`SurfaceSignal`] - Load results and user commands flowing back
//! - [`StdoutSurface`] - NDJSON-over-stdout production surface
//!
//! ### Configuration (`config`)
//! - [`Settings`] - `.skiff/config.toml` with serde defaults
//! - [`RetrySettings`] - Retry policy knobs

pub mod config;
pub mod coordinator;
pub mod surface;

// Public API re-exports
pub use config::{RetrySettings, Settings};
pub use coordinator::{Coordinator, RetryPolicy, SurfaceState};
pub use surface::{StdoutSurface, Surface, SurfaceSignal};
