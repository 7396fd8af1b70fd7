//! RecordingTarget for asserting on interactive repaints

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::console::RepaintTargetFactory;
use crate::renderer::RepaintTarget;

#[derive(Debug, Default)]
struct Recording {
    frames: Vec<String>,
    cleared: Vec<usize>,
    cursor_hidden: bool,
}

/// A repaint target that records every block it is asked to draw
///
/// Clones share one recording, so a test can keep a handle while the
/// renderer owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingTarget {
    recording: Arc<Mutex<Recording>>,
}

impl RecordingTarget {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every drawn block, in order
    #[must_use]
    pub fn frames(&self) -> Vec<String> {
        self.recording().frames.clone()
    }

    /// The most recently drawn block
    #[must_use]
    pub fn last_frame(&self) -> Option<String> {
        self.recording().frames.last().cloned()
    }

    /// Line counts passed to `clear_lines`, in order
    #[must_use]
    pub fn cleared(&self) -> Vec<usize> {
        self.recording().cleared.clone()
    }

    #[must_use]
    pub fn cursor_hidden(&self) -> bool {
        self.recording().cursor_hidden
    }

    /// A factory handing out clones of this target
    #[must_use]
    pub fn factory(&self) -> RepaintTargetFactory {
        let target = self.clone();
        Arc::new(move || Box::new(target.clone()) as Box<dyn RepaintTarget>)
    }

    fn recording(&self) -> MutexGuard<'_, Recording> {
        self.recording.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RepaintTarget for RecordingTarget {
    fn clear_lines(&mut self, n: usize) -> io::Result<()> {
        self.recording().cleared.push(n);
        Ok(())
    }

    fn write_block(&mut self, text: &str) -> io::Result<()> {
        self.recording().frames.push(text.to_string());
        Ok(())
    }

    fn hide_cursor(&mut self) -> io::Result<()> {
        self.recording().cursor_hidden = true;
        Ok(())
    }

    fn show_cursor(&mut self) -> io::Result<()> {
        self.recording().cursor_hidden = false;
        Ok(())
    }
}
