//! TestConsole for capturing output in tests
//!
//! Provides a console whose stdout and stderr are captured for assertion
//! instead of being written to the terminal.

use std::io::Write;
use std::sync::{Arc, Mutex};

use strip_ansi_escapes::strip;

use super::RecordingTarget;
use crate::console::LoglineConsole;

/// A console that captures output for testing
///
/// Use `console()` to get the inner console for loggers and renderers, then
/// use `output()`, `stderr()`, `contains()` and the assertion methods to
/// verify what was written. Searches cover both streams.
#[derive(Clone)]
pub struct TestConsole {
    inner: Arc<LoglineConsole>,
    stdout: Arc<Mutex<TestBuffer>>,
    stderr: Arc<Mutex<TestBuffer>>,
    terminal: bool,
    target: Option<RecordingTarget>,
}

#[derive(Debug, Default)]
struct TestBuffer {
    /// Lines with ANSI codes stripped
    lines: Vec<String>,
    /// Lines with ANSI codes preserved
    raw_lines: Vec<String>,
    /// Bytes after the last newline
    partial: Vec<u8>,
}

impl TestBuffer {
    fn push_line(&mut self, bytes: &[u8]) {
        self.raw_lines
            .push(String::from_utf8_lossy(bytes).into_owned());
        self.lines
            .push(String::from_utf8_lossy(&strip(bytes)).into_owned());
    }

    fn raw(&self) -> Vec<String> {
        let mut lines = self.raw_lines.clone();
        if !self.partial.is_empty() {
            lines.push(String::from_utf8_lossy(&self.partial).into_owned());
        }
        lines
    }

    fn stripped(&self) -> Vec<String> {
        let mut lines = self.lines.clone();
        let rest = strip(&self.partial);
        if !rest.is_empty() {
            lines.push(String::from_utf8_lossy(&rest).into_owned());
        }
        lines
    }
}

impl TestConsole {
    /// Create a new test console that captures output
    #[must_use]
    pub fn new() -> Self {
        let stdout = Arc::new(Mutex::new(TestBuffer::default()));
        let stderr = Arc::new(Mutex::new(TestBuffer::default()));
        let inner = Arc::new(build_console(&stdout, &stderr, false, None));
        Self {
            inner,
            stdout,
            stderr,
            terminal: false,
            target: None,
        }
    }

    /// Report the console as an interactive terminal
    #[must_use]
    pub fn with_terminal(mut self, terminal: bool) -> Self {
        self.terminal = terminal;
        self.rebuild()
    }

    /// Send interactive repaints to `target` instead of stdout
    #[must_use]
    pub fn with_repaint_target(mut self, target: RecordingTarget) -> Self {
        self.target = Some(target);
        self.rebuild()
    }

    fn rebuild(mut self) -> Self {
        self.inner = Arc::new(build_console(
            &self.stdout,
            &self.stderr,
            self.terminal,
            self.target.as_ref(),
        ));
        self
    }

    /// Get the underlying console for passing to loggers and renderers
    #[must_use]
    pub fn console(&self) -> Arc<LoglineConsole> {
        Arc::clone(&self.inner)
    }

    /// Captured stdout lines (ANSI codes stripped)
    #[must_use]
    pub fn output(&self) -> Vec<String> {
        self.stdout.lock().map(|b| b.stripped()).unwrap_or_default()
    }

    /// Captured stderr lines (ANSI codes stripped)
    #[must_use]
    pub fn stderr(&self) -> Vec<String> {
        self.stderr.lock().map(|b| b.stripped()).unwrap_or_default()
    }

    /// Captured stdout lines (with ANSI codes)
    #[must_use]
    pub fn raw_output(&self) -> Vec<String> {
        self.stdout.lock().map(|b| b.raw()).unwrap_or_default()
    }

    /// Captured stderr lines (with ANSI codes)
    #[must_use]
    pub fn raw_stderr(&self) -> Vec<String> {
        self.stderr.lock().map(|b| b.raw()).unwrap_or_default()
    }

    /// Both streams, stdout first (with ANSI codes)
    #[must_use]
    pub fn raw_all(&self) -> Vec<String> {
        let mut lines = self.raw_output();
        lines.extend(self.raw_stderr());
        lines
    }

    /// Both streams, stdout first (ANSI codes stripped)
    #[must_use]
    pub fn all(&self) -> Vec<String> {
        let mut lines = self.output();
        lines.extend(self.stderr());
        lines
    }

    /// All captured output as a single string
    #[must_use]
    pub fn output_string(&self) -> String {
        self.all().join("\n")
    }

    /// Check if output contains a string (case-insensitive)
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        let output = self.output_string().to_lowercase();
        output.contains(&needle.to_lowercase())
    }

    /// Check if output matches a regex pattern
    #[must_use]
    pub fn matches(&self, pattern: &str) -> bool {
        match regex::Regex::new(pattern) {
            Ok(re) => re.is_match(&self.output_string()),
            Err(_) => false,
        }
    }

    /// Assert that output contains a string
    ///
    /// # Panics
    ///
    /// Panics if the output does not contain the needle string.
    pub fn assert_contains(&self, needle: &str) {
        assert!(
            self.contains(needle),
            "Output did not contain '{}'. Actual output:\n{}",
            needle,
            self.output_string()
        );
    }

    /// Assert that output does NOT contain a string
    ///
    /// # Panics
    ///
    /// Panics if the output contains the needle string.
    pub fn assert_not_contains(&self, needle: &str) {
        assert!(
            !self.contains(needle),
            "Output unexpectedly contained '{}'. Actual output:\n{}",
            needle,
            self.output_string()
        );
    }

    /// Assert both streams together hold a specific number of lines
    ///
    /// # Panics
    ///
    /// Panics if the line count doesn't match expected.
    pub fn assert_line_count(&self, expected: usize) {
        let actual = self.all().len();
        assert_eq!(
            actual,
            expected,
            "Expected {} lines but got {}. Actual output:\n{}",
            expected,
            actual,
            self.output_string()
        );
    }

    /// Clear both buffers
    pub fn clear(&self) {
        for buffer in [&self.stdout, &self.stderr] {
            if let Ok(mut buf) = buffer.lock() {
                *buf = TestBuffer::default();
            }
        }
    }
}

impl Default for TestConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TestConsole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestConsole")
            .field("terminal", &self.terminal)
            .field("line_count", &self.all().len())
            .finish()
    }
}

fn build_console(
    stdout: &Arc<Mutex<TestBuffer>>,
    stderr: &Arc<Mutex<TestBuffer>>,
    terminal: bool,
    target: Option<&RecordingTarget>,
) -> LoglineConsole {
    let console = LoglineConsole::with_writers(
        BufferWriter(Arc::clone(stdout)),
        BufferWriter(Arc::clone(stderr)),
    )
    .with_terminal(terminal);
    match target {
        Some(target) => console.with_repaint_target(target.factory()),
        None => console,
    }
}

/// Writer that captures to a buffer, one entry per completed line
struct BufferWriter(Arc<Mutex<TestBuffer>>);

impl Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut buffer) = self.0.lock() {
            buffer.partial.extend_from_slice(buf);
            while let Some(pos) = buffer.partial.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.partial.drain(..=pos).collect();
                buffer.push_line(&line[..line.len() - 1]);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Stream;

    #[test]
    fn test_output_capture() {
        let tc = TestConsole::new();
        tc.console().write_line(Stream::Stdout, "Hello, world!").unwrap();
        assert!(tc.contains("Hello"));
        assert!(tc.contains("world"));
    }

    #[test]
    fn test_contains_case_insensitive() {
        let tc = TestConsole::new();
        tc.console().write_line(Stream::Stdout, "Hello World").unwrap();
        assert!(tc.contains("hello"));
        assert!(tc.contains("WORLD"));
    }

    #[test]
    fn test_streams_are_separate() {
        let tc = TestConsole::new();
        tc.console().write_line(Stream::Stdout, "out").unwrap();
        tc.console().write_line(Stream::Stderr, "err").unwrap();
        assert_eq!(tc.output(), vec!["out"]);
        assert_eq!(tc.stderr(), vec!["err"]);
        assert_eq!(tc.all(), vec!["out", "err"]);
    }

    #[test]
    fn test_split_writes_form_one_line() {
        let tc = TestConsole::new();
        let mut writer = BufferWriter(Arc::clone(&tc.stdout));
        writer.write_all(b"par").unwrap();
        writer.write_all(b"tial\nnext").unwrap();
        assert_eq!(tc.output(), vec!["partial", "next"]);
    }

    #[test]
    fn test_ansi_is_stripped() {
        let tc = TestConsole::new();
        tc.console()
            .write_line(Stream::Stderr, "\u{1b}[31mred\u{1b}[0m")
            .unwrap();
        assert_eq!(tc.stderr(), vec!["red"]);
        assert!(tc.raw_stderr()[0].contains("\u{1b}[31m"));
    }

    #[test]
    fn test_assert_not_contains() {
        let tc = TestConsole::new();
        tc.console().write_line(Stream::Stdout, "Success").unwrap();
        tc.assert_not_contains("Error");
    }

    #[test]
    fn test_clear() {
        let tc = TestConsole::new();
        tc.console().write_line(Stream::Stdout, "Some output").unwrap();
        tc.assert_line_count(1);
        tc.clear();
        tc.assert_line_count(0);
    }

    #[test]
    fn test_matches_regex() {
        let tc = TestConsole::new();
        tc.console().write_line(Stream::Stdout, "Error code: 42").unwrap();
        assert!(tc.matches(r"code: \d+"));
        assert!(!tc.matches(r"code: [a-z]+"));
    }

    #[test]
    fn test_clone_shares_buffers() {
        let tc = TestConsole::new();
        tc.console().write_line(Stream::Stdout, "Test").unwrap();
        let tc2 = tc.clone();
        assert!(tc2.contains("Test"));
    }

    #[test]
    fn test_rebuilt_console_keeps_buffers() {
        let tc = TestConsole::new();
        let before = tc.console();
        let tc = tc.with_terminal(true);
        before.write_line(Stream::Stdout, "old").unwrap();
        tc.console().write_line(Stream::Stdout, "new").unwrap();
        assert!(tc.console().is_terminal());
        assert_eq!(tc.output(), vec!["old", "new"]);
    }
}
