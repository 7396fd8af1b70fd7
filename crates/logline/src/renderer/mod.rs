//! Live task-list rendering.
//!
//! A [`TaskRenderer`] draws a tree of [`TaskNode`]s, one line per visible
//! node, and repaints whenever a node reports a change. Starting a render
//! returns a [`RenderSession`]; dropping the session stops the animation
//! clock, detaches from every node and draws the final frame, on every exit
//! path.
//!
//! ```text
//! ✔ [deploy] Build
//! ⠹ [deploy] Upload
//!     › 12/40 files
//!   ⠹ [deploy] Assets
//! ↓ [deploy] Notify -> disabled by flag
//! ```

mod node;
mod repaint;

pub use node::{SubscriptionId, TaskEvent, TaskListener, TaskNode, TaskState};
pub use repaint::{
    CiRepaint, Frame, InteractiveRepaint, Repaint, RepaintTarget, RepaintTrigger, TermTarget,
    WriterTarget,
};

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use console::{Color, Style};

use crate::config::TimestampFormat;
use crate::console::LoglineConsole;
use crate::emoji::strip_emojis;
use crate::error::RenderBoundary;
use crate::format::{FormatRequest, MessageFormatter};
use crate::logging::targets;
use crate::prefix::PrefixRegistry;
use crate::theme::{Level, get_theme, paint};

/// Glyph set for task lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyphs {
    pub success: &'static str,
    pub failure: &'static str,
    pub skip: &'static str,
    pub interrupted: &'static str,
    pub pending: &'static str,
    pub output: &'static str,
    pub frames: &'static [&'static str],
}

impl Glyphs {
    pub const UNICODE: Glyphs = Glyphs {
        success: "✔",
        failure: "✖",
        skip: "↓",
        interrupted: "◼",
        pending: " ",
        output: "›",
        frames: &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"],
    };

    pub const ASCII: Glyphs = Glyphs {
        success: "v",
        failure: "x",
        skip: "-",
        interrupted: "!",
        pending: " ",
        output: ">",
        frames: &["-", "\\", "|", "/"],
    };

    #[must_use]
    pub fn for_unicode(unicode: bool) -> &'static Glyphs {
        if unicode { &Self::UNICODE } else { &Self::ASCII }
    }

    fn frame(&self, index: usize) -> &'static str {
        self.frames[index % self.frames.len()]
    }
}

/// Presentation settings for one render.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Prefix shown on every task line.
    pub prefix: Option<String>,
    /// Registry the prefix is aligned against.
    pub registry: Arc<PrefixRegistry>,
    pub show_prefix: bool,
    pub use_colors: bool,
    pub unicode: bool,
    /// Keep emoji in titles and output lines.
    pub emoji: bool,
    /// Use the append-only CI strategy.
    pub ci: bool,
    pub frame_interval: Duration,
    pub ci_throttle: Duration,
}

impl RenderOptions {
    #[must_use]
    pub fn new(registry: Arc<PrefixRegistry>) -> Self {
        Self {
            prefix: None,
            registry,
            show_prefix: true,
            use_colors: false,
            unicode: true,
            emoji: true,
            ci: false,
            frame_interval: Duration::from_millis(80),
            ci_throttle: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// Renders one task list for the lifetime of one [`RenderSession`].
pub struct TaskRenderer {
    tasks: Vec<Arc<dyn TaskNode>>,
    options: RenderOptions,
    formatter: MessageFormatter,
    glyphs: &'static Glyphs,
    repaint: Box<dyn Repaint>,
    boundary: RenderBoundary,
    frame: usize,
    finished: bool,
    self_ref: Weak<Mutex<TaskRenderer>>,
    watched: HashSet<usize>,
    subscriptions: Vec<(Arc<dyn TaskNode>, SubscriptionId)>,
}

impl TaskRenderer {
    #[must_use]
    pub fn new(
        tasks: Vec<Arc<dyn TaskNode>>,
        options: RenderOptions,
        repaint: Box<dyn Repaint>,
    ) -> Self {
        if let Some(prefix) = &options.prefix {
            options.registry.register(prefix);
        }
        Self {
            tasks,
            glyphs: Glyphs::for_unicode(options.unicode),
            options,
            formatter: MessageFormatter::new(),
            repaint,
            boundary: RenderBoundary::new("task renderer"),
            frame: 0,
            finished: false,
            self_ref: Weak::new(),
            watched: HashSet::new(),
            subscriptions: Vec::new(),
        }
    }

    /// Pick the repaint strategy for `console` from `options.ci`.
    #[must_use]
    pub fn for_console(
        tasks: Vec<Arc<dyn TaskNode>>,
        options: RenderOptions,
        console: &Arc<LoglineConsole>,
    ) -> Self {
        let repaint: Box<dyn Repaint> = if options.ci {
            Box::new(CiRepaint::new(Arc::clone(console), options.ci_throttle))
        } else {
            Box::new(InteractiveRepaint::new(console.repaint_target()))
        };
        Self::new(tasks, options, repaint)
    }

    /// Render the whole list. With `done` set, still-running nodes are drawn
    /// as interrupted instead of animating.
    #[must_use]
    pub fn build_output(&self, done: bool) -> String {
        self.build(done, self.frame)
    }

    /// Absorbed repaint failures so far.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.boundary.error_count()
    }

    /// Start rendering: subscribe to every node, draw the first frame and
    /// start the animation clock.
    #[must_use]
    pub fn render(self) -> RenderSession {
        let interval = self.options.frame_interval;
        let inner = Arc::new(Mutex::new(self));
        {
            let mut renderer = lock(&inner);
            renderer.self_ref = Arc::downgrade(&inner);
            renderer.watch_all();
            renderer.paint(RepaintTrigger::Changed);
        }

        let (stop, ticks) = mpsc::channel::<()>();
        let weak = Arc::downgrade(&inner);
        let ticker = thread::Builder::new()
            .name("logline-render".into())
            .spawn(move || {
                while let Err(RecvTimeoutError::Timeout) = ticks.recv_timeout(interval) {
                    let Some(inner) = weak.upgrade() else {
                        break;
                    };
                    let mut renderer = lock(&inner);
                    if renderer.finished {
                        break;
                    }
                    renderer.frame = renderer.frame.wrapping_add(1);
                    renderer.paint(RepaintTrigger::Tick);
                }
            });

        let ticker = match ticker {
            Ok(handle) => Some((stop, handle)),
            Err(err) => {
                log::debug!(target: targets::RENDER, "animation clock unavailable: {err}");
                None
            }
        };

        RenderSession { inner, ticker }
    }

    fn build(&self, done: bool, frame: usize) -> String {
        let mut lines = Vec::new();
        for task in &self.tasks {
            self.render_node(task.as_ref(), 0, done, frame, &mut lines);
        }
        lines.join("\n")
    }

    fn render_node(
        &self,
        node: &dyn TaskNode,
        depth: usize,
        done: bool,
        frame: usize,
        lines: &mut Vec<String>,
    ) {
        if !node.is_enabled() {
            return;
        }

        let indent = "  ".repeat(depth);
        let mut title = node.title();
        let skip_reason = node.is_skipped().then(|| node.skip_reason()).flatten();

        let (glyph, color) = if let Some(reason) = skip_reason {
            title = format!("{title} -> {reason}");
            (self.glyphs.skip, Color::Yellow)
        } else if node.has_failed() {
            (self.glyphs.failure, Color::Red)
        } else if node.is_completed() {
            (self.glyphs.success, Color::Green)
        } else if node.is_running() && !done {
            (self.glyphs.frame(frame), Color::Cyan)
        } else if node.is_running() {
            (self.glyphs.interrupted, Color::Yellow)
        } else {
            (self.glyphs.pending, Color::White)
        };

        let glyph = paint(glyph, Style::new().fg(color), self.options.use_colors);
        lines.push(format!("{indent}{glyph} {}", self.format_title(&title)));

        if node.is_running() || node.has_failed() {
            if let Some(output) = node.output() {
                let marker = paint(self.glyphs.output, Style::new().dim(), self.options.use_colors);
                for line in output.lines().filter(|l| !l.trim().is_empty()) {
                    let line = if self.options.emoji {
                        Cow::Borrowed(line)
                    } else {
                        strip_emojis(line)
                    };
                    lines.push(format!("{indent}    {marker} {line}"));
                }
            }
        }

        if node.is_started() && !node.is_skipped() {
            for subtask in node.subtasks() {
                self.render_node(subtask.as_ref(), depth + 1, done, frame, lines);
            }
        }
    }

    fn format_title(&self, title: &str) -> String {
        let mut request = FormatRequest::new(title)
            .timestamp(TimestampFormat::Off)
            .colors(self.options.use_colors)
            .strip_emojis(!self.options.emoji);
        request.level = Level::Task;
        request.theme = Some(get_theme(Level::Task, None, self.options.unicode, true));
        if self.options.show_prefix {
            if let Some(prefix) = self.options.prefix.as_deref() {
                request = request.prefix(prefix, self.options.registry.max_length());
            }
        }
        self.formatter.format(&request)
    }

    fn current_frame(&self, done: bool) -> Frame {
        Frame {
            text: self.build(done, self.frame),
            key: self.build(done, 0),
        }
    }

    fn paint(&mut self, trigger: RepaintTrigger) {
        let frame = self.current_frame(false);
        let result = self.repaint.update(&frame, trigger, Instant::now());
        self.boundary.wrap_with_context(result, "repaint");
    }

    fn watch_all(&mut self) {
        for task in self.tasks.clone() {
            self.watch(&task);
        }
    }

    fn watch(&mut self, node: &Arc<dyn TaskNode>) {
        if self.watched.insert(node_id(node)) {
            let id = node.subscribe(listener(self.self_ref.clone()));
            self.subscriptions.push((Arc::clone(node), id));
        }
        for subtask in node.subtasks() {
            self.watch(&subtask);
        }
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        for (node, id) in self.subscriptions.drain(..) {
            node.unsubscribe(id);
        }
        let frame = self.current_frame(true);
        let result = self.repaint.finish(&frame);
        self.boundary.wrap_with_context(result, "final repaint");
    }
}

fn listener(renderer: Weak<Mutex<TaskRenderer>>) -> TaskListener {
    Arc::new(move |event: &TaskEvent| {
        let Some(inner) = renderer.upgrade() else {
            return;
        };
        let mut renderer = lock(&inner);
        if renderer.finished {
            return;
        }
        if *event == TaskEvent::SubtaskAdded {
            renderer.watch_all();
        }
        let trigger = if event.is_settling() {
            RepaintTrigger::Settled
        } else {
            RepaintTrigger::Changed
        };
        renderer.paint(trigger);
    })
}

fn node_id(node: &Arc<dyn TaskNode>) -> usize {
    Arc::as_ptr(node).cast::<()>() as usize
}

fn lock(inner: &Mutex<TaskRenderer>) -> MutexGuard<'_, TaskRenderer> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A running render. Dropping it ends the render.
pub struct RenderSession {
    inner: Arc<Mutex<TaskRenderer>>,
    ticker: Option<(mpsc::Sender<()>, JoinHandle<()>)>,
}

impl RenderSession {
    /// Repaint now, outside the event and animation schedule.
    pub fn refresh(&self) {
        let mut renderer = lock(&self.inner);
        if !renderer.finished {
            renderer.paint(RepaintTrigger::Changed);
        }
    }

    /// Append a top-level node to the running render and repaint. Nodes
    /// already in the list are left where they are.
    pub fn add_task(&self, node: Arc<dyn TaskNode>) {
        let mut renderer = lock(&self.inner);
        if renderer.finished {
            return;
        }
        let id = node_id(&node);
        if renderer.tasks.iter().any(|task| node_id(task) == id) {
            return;
        }
        renderer.tasks.push(Arc::clone(&node));
        renderer.watch(&node);
        renderer.paint(RepaintTrigger::Changed);
    }

    /// Current rendering, as [`TaskRenderer::build_output`].
    #[must_use]
    pub fn output(&self, done: bool) -> String {
        lock(&self.inner).build_output(done)
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        lock(&self.inner).error_count()
    }

    /// End the render and draw the final frame.
    pub fn end(self) {}
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        if let Some((stop, handle)) = self.ticker.take() {
            drop(stop);
            if handle.join().is_err() {
                log::debug!(target: targets::RENDER, "animation clock panicked");
            }
        }
        lock(&self.inner).finish();
    }
}

impl std::fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("animating", &self.ticker.is_some())
            .finish_non_exhaustive()
    }
}
