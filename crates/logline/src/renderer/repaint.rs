//! Repaint strategies.
//!
//! A rendered task list is pushed to the screen through a [`Repaint`]. The
//! interactive strategy rewrites the block in place through a
//! [`RepaintTarget`]; the CI strategy only ever appends lines.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use console::Term;

use crate::console::{LoglineConsole, SharedWriter, Stream, lock_writer};
use crate::error::LoglineError;

/// What caused a repaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepaintTrigger {
    /// The animation clock advanced.
    Tick,
    /// A node changed title, output or subtasks, or started.
    Changed,
    /// A node completed, failed or was skipped.
    Settled,
}

/// One rendering of the task list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// What is shown.
    pub text: String,
    /// The same rendering with the animation frame pinned, so two frames with
    /// equal keys differ only by spinner glyphs.
    pub key: String,
}

/// Pushes frames to an output.
pub trait Repaint: Send {
    fn update(&mut self, frame: &Frame, trigger: RepaintTrigger, now: Instant) -> io::Result<()>;

    /// Draw the final frame and release the output.
    fn finish(&mut self, frame: &Frame) -> io::Result<()>;
}

/// A cursor-addressable output for in-place rewrites.
pub trait RepaintTarget: Send {
    /// Erase the last `n` lines and leave the cursor at the start of the first.
    fn clear_lines(&mut self, n: usize) -> io::Result<()>;

    /// Write `text` followed by a newline.
    fn write_block(&mut self, text: &str) -> io::Result<()>;

    fn hide_cursor(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn show_cursor(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The real terminal.
#[derive(Debug)]
pub struct TermTarget {
    term: Term,
}

impl TermTarget {
    #[must_use]
    pub fn stdout() -> Self {
        Self {
            term: Term::buffered_stdout(),
        }
    }
}

impl RepaintTarget for TermTarget {
    fn clear_lines(&mut self, n: usize) -> io::Result<()> {
        if n > 0 {
            self.term.clear_last_lines(n)?;
        }
        Ok(())
    }

    fn write_block(&mut self, text: &str) -> io::Result<()> {
        for line in text.lines() {
            self.term.write_line(line)?;
        }
        self.term.flush()
    }

    fn hide_cursor(&mut self) -> io::Result<()> {
        self.term.hide_cursor()?;
        self.term.flush()
    }

    fn show_cursor(&mut self) -> io::Result<()> {
        self.term.show_cursor()?;
        self.term.flush()
    }
}

const CURSOR_UP: &str = "\u{1b}[1A";
const ERASE_LINE: &str = "\u{1b}[2K";
const HIDE_CURSOR: &str = "\u{1b}[?25l";
const SHOW_CURSOR: &str = "\u{1b}[?25h";

/// Cursor escapes written into an arbitrary writer.
pub struct WriterTarget {
    writer: SharedWriter,
}

impl WriterTarget {
    #[must_use]
    pub fn new(writer: SharedWriter) -> Self {
        Self { writer }
    }

    fn emit(&self, text: &str) -> io::Result<()> {
        let mut writer = lock_writer(&self.writer);
        writer.write_all(text.as_bytes())?;
        writer.flush()
    }
}

impl RepaintTarget for WriterTarget {
    fn clear_lines(&mut self, n: usize) -> io::Result<()> {
        self.emit(&format!("{CURSOR_UP}{ERASE_LINE}").repeat(n))
    }

    fn write_block(&mut self, text: &str) -> io::Result<()> {
        let mut block = String::with_capacity(text.len() + 1);
        for line in text.lines() {
            block.push_str(line);
            block.push('\n');
        }
        self.emit(&block)
    }

    fn hide_cursor(&mut self) -> io::Result<()> {
        self.emit(HIDE_CURSOR)
    }

    fn show_cursor(&mut self) -> io::Result<()> {
        self.emit(SHOW_CURSOR)
    }
}

/// Erase-and-redraw of the whole block on every change.
pub struct InteractiveRepaint {
    target: Box<dyn RepaintTarget>,
    drawn_lines: usize,
    last_text: Option<String>,
}

impl InteractiveRepaint {
    #[must_use]
    pub fn new(target: Box<dyn RepaintTarget>) -> Self {
        Self {
            target,
            drawn_lines: 0,
            last_text: None,
        }
    }

    fn redraw(&mut self, text: &str) -> io::Result<()> {
        if self.last_text.as_deref() == Some(text) {
            return Ok(());
        }
        if self.last_text.is_none() {
            self.target.hide_cursor()?;
        }
        self.target.clear_lines(self.drawn_lines)?;
        self.target.write_block(text)?;
        self.drawn_lines = text.lines().count();
        self.last_text = Some(text.to_string());
        Ok(())
    }
}

impl Repaint for InteractiveRepaint {
    fn update(&mut self, frame: &Frame, _trigger: RepaintTrigger, _now: Instant) -> io::Result<()> {
        self.redraw(&frame.text)
    }

    fn finish(&mut self, frame: &Frame) -> io::Result<()> {
        let drawn = self.redraw(&frame.text);
        // The block stays on screen; later output goes below it.
        self.drawn_lines = 0;
        let shown = self.target.show_cursor();
        drawn.and(shown)
    }
}

/// Append-only output for captured logs.
///
/// A line is printed when its pinned-frame key has not been printed before,
/// so completions, failures, title and output changes always appear at once.
/// Pure animation churn is printed at most once per throttle window.
pub struct CiRepaint {
    console: Arc<LoglineConsole>,
    throttle: Duration,
    emitted: HashMap<String, usize>,
    last_text: String,
    last_emit: Option<Instant>,
    churn: bool,
}

impl CiRepaint {
    #[must_use]
    pub fn new(console: Arc<LoglineConsole>, throttle: Duration) -> Self {
        Self {
            console,
            throttle,
            emitted: HashMap::new(),
            last_text: String::new(),
            last_emit: None,
            churn: false,
        }
    }

    fn write(&self, line: &str) -> io::Result<()> {
        self.console
            .write_line(Stream::Stdout, line)
            .map_err(|err| match err {
                LoglineError::Io(io) => io,
                other => io::Error::other(other.to_string()),
            })
    }

    /// Emit every line whose key is new; returns how many were written.
    fn emit_new(&mut self, frame: &Frame) -> io::Result<usize> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut written = 0;
        for (line, key) in frame.text.lines().zip(frame.key.lines()) {
            let ordinal = seen.entry(key).or_insert(0);
            *ordinal += 1;
            let emitted = self.emitted.get(key).copied().unwrap_or(0);
            if *ordinal > emitted {
                self.write(line)?;
                self.emitted.insert(key.to_string(), *ordinal);
                written += 1;
            }
        }
        Ok(written)
    }

    /// Emit lines whose visible text changed since the last frame.
    fn emit_changed(&mut self, frame: &Frame) -> io::Result<()> {
        let previous: Vec<&str> = self.last_text.lines().collect();
        for (i, line) in frame.text.lines().enumerate() {
            if previous.get(i) != Some(&line) {
                self.write(line)?;
            }
        }
        Ok(())
    }

    fn throttle_elapsed(&self, now: Instant) -> bool {
        self.last_emit
            .is_none_or(|last| now.saturating_duration_since(last) >= self.throttle)
    }
}

impl Repaint for CiRepaint {
    fn update(&mut self, frame: &Frame, trigger: RepaintTrigger, now: Instant) -> io::Result<()> {
        if frame.text == self.last_text {
            return Ok(());
        }

        if self.emit_new(frame)? > 0 {
            self.last_emit = Some(now);
            self.churn = false;
        } else {
            self.churn = true;
        }

        if self.churn && (trigger == RepaintTrigger::Settled || self.throttle_elapsed(now)) {
            self.emit_changed(frame)?;
            self.last_emit = Some(now);
            self.churn = false;
        }

        if !self.churn {
            self.last_text.clone_from(&frame.text);
        }
        Ok(())
    }

    fn finish(&mut self, frame: &Frame) -> io::Result<()> {
        self.emit_new(frame)?;
        self.last_text.clone_from(&frame.text);
        self.churn = false;
        Ok(())
    }
}
