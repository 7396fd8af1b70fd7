//! Error taxonomy.
//!
//! Caller-contract violations ([`LoglineError::SpinnerActive`],
//! [`LoglineError::UnknownLevel`]) are returned to the caller. Best-effort
//! rendering failures go through a [`RenderBoundary`] instead, which absorbs
//! and counts them.

mod boundary;

pub use boundary::RenderBoundary;

use std::fmt;
use std::io;

/// Errors surfaced by logline.
#[derive(Debug)]
pub enum LoglineError {
    /// A spinner was started under a key that already has an active spinner.
    SpinnerActive { key: String },
    /// A level name that is not part of the theme table.
    UnknownLevel(String),
    /// Writing to an output stream failed.
    Io(io::Error),
    /// A lock was poisoned by a panicking writer.
    Poisoned(&'static str),
}

impl fmt::Display for LoglineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpinnerActive { key } => write!(
                f,
                "a spinner is already active for key '{key}'; call succeed, fail, warn, info \
                 or stop on '{key}' before starting another"
            ),
            Self::UnknownLevel(name) => write!(f, "unknown log level '{name}'"),
            Self::Io(err) => write!(f, "output error: {err}"),
            Self::Poisoned(what) => write!(f, "{what} lock poisoned"),
        }
    }
}

impl std::error::Error for LoglineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for LoglineError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
