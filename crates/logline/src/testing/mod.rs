//! Testing utilities for logline output
//!
//! Provides `TestConsole` for capturing and asserting on console output, and
//! `RecordingTarget` for asserting on interactive task-list repaints.

mod recording;
mod test_console;

pub use crate::format::FixedClock;
pub use recording::RecordingTarget;
pub use test_console::TestConsole;
