//! Output sinks.
//!
//! A [`LoglineConsole`] owns the two line-oriented streams a logger writes to
//! and knows how to open a cursor-addressable [`RepaintTarget`] for live task
//! rendering.

use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::error::LoglineError;
use crate::renderer::{RepaintTarget, TermTarget, WriterTarget};
use crate::theme::Level;

/// A writer shared between a console and the repaint targets it hands out.
pub type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Produces a fresh repaint target for each render.
pub type RepaintTargetFactory = Arc<dyn Fn() -> Box<dyn RepaintTarget> + Send + Sync>;

/// Destination stream of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    /// Errors and warnings go to stderr, everything else to stdout.
    #[must_use]
    pub fn for_level(level: Level) -> Self {
        match level {
            Level::Error | Level::Warn => Self::Stderr,
            _ => Self::Stdout,
        }
    }
}

/// Line sink for formatted log output
pub struct LoglineConsole {
    stdout: SharedWriter,
    stderr: SharedWriter,
    terminal: bool,
    repaint: Option<RepaintTargetFactory>,
}

impl LoglineConsole {
    /// Console over the process's standard streams
    #[must_use]
    pub fn new() -> Self {
        Self {
            stdout: shared(io::stdout()),
            stderr: shared(io::stderr()),
            terminal: io::stdout().is_terminal(),
            repaint: None,
        }
    }

    /// Console over custom writers (for testing or redirection)
    #[must_use]
    pub fn with_writers<O, E>(stdout: O, stderr: E) -> Self
    where
        O: Write + Send + 'static,
        E: Write + Send + 'static,
    {
        Self {
            stdout: shared(stdout),
            stderr: shared(stderr),
            terminal: false,
            repaint: None,
        }
    }

    /// Report the console as a terminal (or not), regardless of its writers
    #[must_use]
    pub fn with_terminal(mut self, terminal: bool) -> Self {
        self.terminal = terminal;
        self
    }

    /// Use `factory` for interactive repaints instead of the default target
    #[must_use]
    pub fn with_repaint_target(mut self, factory: RepaintTargetFactory) -> Self {
        self.repaint = Some(factory);
        self
    }

    // ─────────────────────────────────────────────────
    // State Queries
    // ─────────────────────────────────────────────────

    /// Whether stdout is an interactive terminal
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    // ─────────────────────────────────────────────────
    // Output Methods
    // ─────────────────────────────────────────────────

    /// Write one line to `stream` and flush it.
    pub fn write_line(&self, stream: Stream, line: &str) -> Result<(), LoglineError> {
        let writer = match stream {
            Stream::Stdout => &self.stdout,
            Stream::Stderr => &self.stderr,
        };
        let mut writer = writer.lock().map_err(|_| LoglineError::Poisoned("console writer"))?;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }

    /// A target for in-place repaints of a rendered block.
    ///
    /// Consoles over the real stdout use the terminal directly; consoles over
    /// custom writers emit cursor escapes into their stdout writer.
    #[must_use]
    pub fn repaint_target(&self) -> Box<dyn RepaintTarget> {
        if let Some(factory) = &self.repaint {
            return factory();
        }
        if self.terminal {
            Box::new(TermTarget::stdout())
        } else {
            Box::new(WriterTarget::new(Arc::clone(&self.stdout)))
        }
    }
}

impl Default for LoglineConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LoglineConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoglineConsole")
            .field("terminal", &self.terminal)
            .field("custom_repaint", &self.repaint.is_some())
            .finish_non_exhaustive()
    }
}

fn shared<W: Write + Send + 'static>(writer: W) -> SharedWriter {
    Arc::new(Mutex::new(Box::new(writer)))
}

// ─────────────────────────────────────────────────────────
// Global Console Accessor
// ─────────────────────────────────────────────────────────

static CONSOLE: OnceLock<Arc<LoglineConsole>> = OnceLock::new();

/// Get the global console instance
#[must_use]
pub fn console() -> Arc<LoglineConsole> {
    Arc::clone(CONSOLE.get_or_init(|| Arc::new(LoglineConsole::new())))
}

/// Install the global console
/// Must be called before any output; returns error if already initialized
pub fn init_console(console: LoglineConsole) -> Result<(), &'static str> {
    CONSOLE
        .set(Arc::new(console))
        .map_err(|_| "Console already initialized")
}

// ─────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────

/// Remove ANSI escape sequences from `text`
#[must_use]
pub fn strip_ansi(text: &str) -> String {
    strip_ansi_escapes::strip_str(text)
}

// Poisoned writers are still usable for best-effort output.
pub(crate) fn lock_writer(writer: &SharedWriter) -> std::sync::MutexGuard<'_, Box<dyn Write + Send>> {
    writer.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Buf(Arc<Mutex<Vec<u8>>>);

    impl Write for Buf {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Buf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_stream_routing() {
        assert_eq!(Stream::for_level(Level::Error), Stream::Stderr);
        assert_eq!(Stream::for_level(Level::Warn), Stream::Stderr);
        for level in [Level::Info, Level::Debug, Level::Trace, Level::Plain, Level::Task] {
            assert_eq!(Stream::for_level(level), Stream::Stdout);
        }
    }

    #[test]
    fn test_write_line_routes_to_stream() {
        let out = Buf::default();
        let err = Buf::default();
        let console = LoglineConsole::with_writers(out.clone(), err.clone());

        console.write_line(Stream::Stdout, "hello").unwrap();
        console.write_line(Stream::Stderr, "oops").unwrap();

        assert_eq!(out.text(), "hello\n");
        assert_eq!(err.text(), "oops\n");
    }

    #[test]
    fn test_custom_writers_are_not_terminals() {
        let console = LoglineConsole::with_writers(io::sink(), io::sink());
        assert!(!console.is_terminal());
        assert!(console.with_terminal(true).is_terminal());
    }

    #[test]
    fn test_writer_repaint_target_writes_to_stdout() {
        let out = Buf::default();
        let console = LoglineConsole::with_writers(out.clone(), io::sink());
        let mut target = console.repaint_target();
        target.write_block("a\nb").unwrap();
        target.clear_lines(2).unwrap();

        let text = out.text();
        assert!(text.starts_with("a\nb\n"));
        assert_eq!(strip_ansi(&text), "a\nb\n");
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\u{1b}[31mred\u{1b}[0m"), "red");
        assert_eq!(strip_ansi("plain"), "plain");
    }
}
