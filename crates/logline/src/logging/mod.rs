//! Logging integration.
//!
//! Two directions are covered here:
//!
//! - **Inbound**: [`LoglineLogger`] and [`LoglineLayer`] let records from the
//!   [`log`] facade and from [`tracing`] events be written as logline lines,
//!   with the record target as the prefix.
//! - **Outbound**: logline's own diagnostics (absorbed write errors, spinner
//!   lifecycle, animation clock failures) go through the [`log`] facade at
//!   debug level under the hierarchical [`targets`].
//!
//! # Log Targets
//!
//! - `logline`: Root target for all logline diagnostics
//! - `logline::render`: Task rendering and the animation clock
//! - `logline::spinner`: Spinner lifecycle
//! - `logline::format`: Line formatting and JSON serialization
//!
//! Records under the root target are never fed back into the bridges, so an
//! installed [`LoglineLogger`] cannot recurse on its own write failures.
//!
//! Example filter: `RUST_LOG=logline::render=debug`

mod bridge;
mod subscriber;

pub use bridge::{LoglineLogger, LoglineLoggerBuilder};
pub use subscriber::{LoglineLayer, LoglineSubscriberBuilder};

/// Log targets used by logline's own diagnostics.
pub mod targets {
    /// Root target for all logline logs.
    pub const LOGLINE: &str = "logline";

    /// Task rendering, repaint and the animation clock.
    pub const RENDER: &str = "logline::render";

    /// Spinner start, update and settle events.
    pub const SPINNER: &str = "logline::spinner";

    /// Message formatting and JSON serialization.
    pub const FORMAT: &str = "logline::format";

    /// Whether `target` is logline's root target or nested under it.
    #[must_use]
    pub fn is_internal(target: &str) -> bool {
        target
            .strip_prefix(LOGLINE)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    }
}
