//! RenderBoundary for absorbing best-effort failures.
//!
//! Logging and repainting must never take down the host program. Operations
//! that can fail for reasons the caller cannot act on (a closed pipe, a
//! poisoned writer lock) are wrapped in a [`RenderBoundary`], which swallows
//! the error, records it, and reports it through the `log` facade on the
//! `logline::render` target.
//!
//! # Example
//!
//! ```rust,ignore
//! use logline::error::RenderBoundary;
//!
//! let boundary = RenderBoundary::new("task renderer");
//! boundary.wrap(console.write_line(Stream::Stdout, "frame"));
//!
//! if boundary.has_errors() {
//!     eprintln!("{} frames were dropped", boundary.error_count());
//! }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::logging::targets;

/// Swallows and counts failures from best-effort output operations.
///
/// The error count is atomic, so a boundary can be shared between the
/// animation thread and event callbacks.
#[derive(Debug)]
pub struct RenderBoundary {
    scope: &'static str,
    error_count: AtomicUsize,
}

impl RenderBoundary {
    /// Creates a boundary; `scope` names the component in diagnostics.
    #[must_use]
    pub fn new(scope: &'static str) -> Self {
        Self {
            scope,
            error_count: AtomicUsize::new(0),
        }
    }

    /// Wraps a `Result`, absorbing the error.
    ///
    /// Returns `Some(value)` on success, or `None` after recording the error.
    pub fn wrap<T, E>(&self, result: Result<T, E>) -> Option<T>
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.record(&e);
                None
            }
        }
    }

    /// Wraps a `Result` with a short description of the failed operation.
    pub fn wrap_with_context<T, E>(&self, result: Result<T, E>, context: &str) -> Option<T>
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.record(&format!("{context}: {e}"));
                None
            }
        }
    }

    /// Gets the total number of absorbed errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Checks if any errors were absorbed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Resets the error count to zero.
    pub fn reset_count(&self) {
        self.error_count.store(0, Ordering::Relaxed);
    }

    fn record(&self, error: &dyn std::fmt::Display) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
        log::debug!(target: targets::RENDER, "{} absorbed error: {}", self.scope, error);
    }
}
