//! # skiff-core - Core Domain Types
//!
//! Foundation crate for skiff. Provides supervisor event types, the bridge
//! message vocabulary, error handling, and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on
//! external crates (serde, chrono, thiserror, tracing).
//!
//! ## Public API
//!
//! ### Events (`events`)
//! - [`SupervisorEvent`] - Timestamped observation of the backend process
//! - [`EventKind`] - Output / ErrorOutput / Exited / SpawnFailed
//!
//! ### Bridge (`bridge`)
//! - [`Notification`] - Surface-bound message with its wire channel name
//! - [`RESTART_COMMAND`] - Inbound restart command channel name
//! - [`is_ready_marker()`] - Detect the backend's "server up" banner
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use skiff_core::prelude::*;
//! ```

pub mod bridge;
pub mod error;
pub mod events;
pub mod logging;

/// Prelude for common imports used throughout all skiff crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use bridge::{is_ready_marker, Notification, RESTART_COMMAND};
pub use error::{Error, Result, ResultExt};
pub use events::{EventKind, SupervisorEvent};
