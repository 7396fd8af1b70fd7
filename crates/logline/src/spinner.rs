//! Spinner façade.
//!
//! `start`/`update`/`succeed`/`fail`/`warn`/`info`/`stop` over named keys,
//! each key backed by a [`TaskRun`]. All live keys of one façade share a
//! single render, so their lines are drawn as one task list. When live
//! rendering is not available (JSON output, no terminal and no CI, spinners
//! turned off) every call degrades to a single log line at a matching level.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::error::LoglineError;
use crate::logger::LoggerCore;
use crate::logging::targets;
use crate::renderer::{RenderSession, TaskNode, TaskRenderer};
use crate::task::{Gate, RunOutcome, Task, TaskRun, Verdict};
use crate::theme::Level;

struct ActiveSpinner {
    task: Arc<Task>,
    run: Option<(Gate, TaskRun)>,
}

#[derive(Default)]
struct Registry {
    entries: HashMap<String, ActiveSpinner>,
    /// Held strongly only by the runs; ends with the last of them.
    session: Weak<RenderSession>,
}

/// Per-logger spinner registry.
pub struct SpinnerFacade {
    core: Arc<LoggerCore>,
    default_key: String,
    active: Mutex<Registry>,
}

impl SpinnerFacade {
    pub(crate) fn new(core: Arc<LoggerCore>, default_key: String) -> Self {
        Self {
            core,
            default_key,
            active: Mutex::new(Registry::default()),
        }
    }

    /// Key used by [`Spinner`] handles from [`Logger::spinner`](crate::Logger::spinner).
    #[must_use]
    pub fn default_key(&self) -> &str {
        &self.default_key
    }

    /// Start a spinner under `key`.
    ///
    /// A live spinner is running and drawn when this returns. It joins the
    /// render of any other live key of this façade.
    ///
    /// # Errors
    ///
    /// [`LoglineError::SpinnerActive`] if `key` already has a spinner that was
    /// not completed or stopped.
    pub fn start(&self, key: &str, text: &str) -> Result<(), LoglineError> {
        let mut active = self.active();
        if active.entries.contains_key(key) {
            return Err(LoglineError::SpinnerActive {
                key: key.to_string(),
            });
        }

        let task = Task::new(text);
        let run = if self.core.spinners_enabled() {
            let session = match active.session.upgrade() {
                Some(session) => session,
                None => {
                    task.start();
                    let session = Arc::new(
                        TaskRenderer::for_console(
                            vec![Arc::clone(&task) as Arc<dyn TaskNode>],
                            self.core.render_options(),
                            &self.core.console,
                        )
                        .render(),
                    );
                    active.session = Arc::downgrade(&session);
                    session
                }
            };
            self.core.boundary.wrap_with_context(
                TaskRun::attach(Arc::clone(&task), session),
                "spawning spinner",
            )
        } else {
            None
        };
        if run.is_none() {
            self.core.emit(Level::Task, text, &[]);
        }

        log::debug!(target: targets::SPINNER, "spinner '{key}' started (live: {})", run.is_some());
        active
            .entries
            .insert(key.to_string(), ActiveSpinner { task, run });
        Ok(())
    }

    /// Change the text of an active spinner. Unknown keys are ignored.
    pub fn update(&self, key: &str, text: &str) {
        let active = self.active();
        let Some(spinner) = active.entries.get(key) else {
            return;
        };
        spinner.task.set_title(text);
        if spinner.run.is_none() {
            self.core.emit(Level::Task, text, &[]);
        }
    }

    /// Show `text` as captured output under an active spinner.
    pub fn output(&self, key: &str, text: &str) {
        let active = self.active();
        let Some(spinner) = active.entries.get(key) else {
            return;
        };
        spinner.task.set_output(text);
        if spinner.run.is_none() {
            self.core.emit(Level::Plain, text, &[]);
        }
    }

    /// End a spinner without a verdict.
    pub fn stop(&self, key: &str) -> Option<RunOutcome> {
        self.settle(key, Verdict::Stop, None)
    }

    /// Complete a spinner successfully; the text defaults to `Done`.
    pub fn succeed(&self, key: &str, text: Option<&str>) -> Option<RunOutcome> {
        self.settle(key, Verdict::Success, Some(text.unwrap_or("Done")))
    }

    /// Complete a spinner with a warning; the text defaults to `Warning`.
    pub fn warn(&self, key: &str, text: Option<&str>) -> Option<RunOutcome> {
        self.settle(key, Verdict::Warn, Some(text.unwrap_or("Warning")))
    }

    /// Complete a spinner with a note; the text defaults to `Info`.
    pub fn info(&self, key: &str, text: Option<&str>) -> Option<RunOutcome> {
        self.settle(key, Verdict::Info, Some(text.unwrap_or("Info")))
    }

    /// Fail a spinner; the text defaults to `Failed`.
    pub fn fail(&self, key: &str, text: Option<&str>) -> Option<RunOutcome> {
        let text = text.unwrap_or("Failed");
        let spinner = self.active().entries.remove(key)?;
        spinner.task.set_title(text);
        log::debug!(target: targets::SPINNER, "spinner '{key}' failed");

        match spinner.run {
            Some((gate, run)) => {
                gate.reject(text);
                Some(run.join())
            }
            None => {
                self.core.emit(Level::Error, text, &[]);
                Some(RunOutcome::Rejected(text.to_string()))
            }
        }
    }

    #[must_use]
    pub fn is_active(&self, key: &str) -> bool {
        self.active().entries.contains_key(key)
    }

    /// Keys with an active spinner, sorted.
    #[must_use]
    pub fn active_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.active().entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn settle(&self, key: &str, verdict: Verdict, text: Option<&str>) -> Option<RunOutcome> {
        // Released before joining so other keys stay usable meanwhile.
        let spinner = self.active().entries.remove(key)?;
        if let Some(text) = text {
            spinner.task.set_title(text);
        }
        log::debug!(target: targets::SPINNER, "spinner '{key}' settled: {verdict:?}");

        match spinner.run {
            Some((gate, run)) => {
                gate.resolve(verdict);
                Some(run.join())
            }
            None => {
                let level = match verdict {
                    Verdict::Success => Some(Level::Success),
                    Verdict::Warn => Some(Level::Warn),
                    Verdict::Info => Some(Level::Info),
                    Verdict::Stop => None,
                };
                if let (Some(level), Some(text)) = (level, text) {
                    self.core.emit(level, text, &[]);
                }
                Some(RunOutcome::Resolved(verdict))
            }
        }
    }

    fn active(&self) -> MutexGuard<'_, Registry> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SpinnerFacade {
    fn drop(&mut self) {
        let active: Vec<ActiveSpinner> = self.active().entries.drain().map(|(_, s)| s).collect();
        for spinner in active {
            if let Some((gate, run)) = spinner.run {
                drop(gate);
                run.join();
            }
        }
    }
}

impl std::fmt::Debug for SpinnerFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpinnerFacade")
            .field("default_key", &self.default_key)
            .field("active", &self.active_keys())
            .finish()
    }
}

/// A spinner handle bound to one key.
#[derive(Debug, Clone, Copy)]
pub struct Spinner<'a> {
    facade: &'a SpinnerFacade,
    key: &'a str,
}

impl<'a> Spinner<'a> {
    pub(crate) fn new(facade: &'a SpinnerFacade, key: &'a str) -> Self {
        Self { facade, key }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        self.key
    }

    /// See [`SpinnerFacade::start`].
    ///
    /// # Errors
    ///
    /// [`LoglineError::SpinnerActive`] if this key is already spinning.
    pub fn start(&self, text: &str) -> Result<(), LoglineError> {
        self.facade.start(self.key, text)
    }

    pub fn update(&self, text: &str) {
        self.facade.update(self.key, text);
    }

    pub fn output(&self, text: &str) {
        self.facade.output(self.key, text);
    }

    pub fn stop(&self) -> Option<RunOutcome> {
        self.facade.stop(self.key)
    }

    pub fn succeed(&self, text: Option<&str>) -> Option<RunOutcome> {
        self.facade.succeed(self.key, text)
    }

    pub fn fail(&self, text: Option<&str>) -> Option<RunOutcome> {
        self.facade.fail(self.key, text)
    }

    pub fn warn(&self, text: Option<&str>) -> Option<RunOutcome> {
        self.facade.warn(self.key, text)
    }

    pub fn info(&self, text: Option<&str>) -> Option<RunOutcome> {
        self.facade.info(self.key, text)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.facade.is_active(self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggerConfig;
    use crate::detection::Environment;
    use crate::logger::Logger;
    use crate::prefix::PrefixRegistry;
    use crate::testing::{RecordingTarget, TestConsole};
    use std::time::Duration;

    fn live_logger() -> (Logger, TestConsole, RecordingTarget) {
        let target = RecordingTarget::new();
        let tc = TestConsole::new().with_repaint_target(target.clone());
        let logger = Logger::builder()
            .prefix("deploy")
            .environment(Environment::from_vars([("LOGLINE_DISABLE_CI", "1")]))
            .config(
                LoggerConfig::new()
                    .spinners(true)
                    .force_color(false)
                    .with_frame_interval(Duration::from_secs(60)),
            )
            .registry(Arc::new(PrefixRegistry::new()))
            .console(tc.console())
            .build();
        (logger, tc, target)
    }

    fn fallback_logger() -> (Logger, TestConsole) {
        let tc = TestConsole::new();
        let logger = Logger::builder()
            .environment(Environment::from_vars([("CI", "")]).with_var("LOGLINE_DISABLE_CI", "1"))
            .config(LoggerConfig::new().force_color(false).force_unicode(false))
            .registry(Arc::new(PrefixRegistry::new()))
            .console(tc.console())
            .build();
        (logger, tc)
    }

    #[test]
    fn test_start_twice_is_an_error() {
        let (logger, _, _) = live_logger();
        let spinners = logger.spinners();
        spinners.start("x", "one").unwrap();
        let err = spinners.start("x", "two").unwrap_err();
        assert!(matches!(err, LoglineError::SpinnerActive { ref key } if key == "x"));
        spinners.succeed("x", None);
        spinners.start("x", "three").unwrap();
        spinners.stop("x");
    }

    #[test]
    fn test_succeed_resolves_and_frees_key() {
        let (logger, _, target) = live_logger();
        let spinners = logger.spinners();
        spinners.start("deploy", "Deploying").unwrap();
        assert!(spinners.is_active("deploy"));

        let outcome = spinners.succeed("deploy", Some("Done"));
        assert_eq!(outcome, Some(RunOutcome::Resolved(Verdict::Success)));
        assert!(!spinners.is_active("deploy"));
        let last = target.last_frame().unwrap();
        assert!(last.starts_with('✔'));
        assert!(last.ends_with("Done"));
    }

    #[test]
    fn test_update_changes_title_only() {
        let (logger, _, target) = live_logger();
        let spinners = logger.spinners();
        spinners.start("k", "Step 1").unwrap();
        spinners.update("k", "Step 2");
        assert!(spinners.is_active("k"));
        spinners.fail("k", None);

        let frames = target.frames();
        assert!(frames.iter().any(|f| f.contains("Step 2")));
        assert!(target.last_frame().unwrap().contains("✖ [deploy] Failed"));
    }

    #[test]
    fn test_unknown_keys_are_noops() {
        let (logger, tc, target) = live_logger();
        let spinners = logger.spinners();
        spinners.update("ghost", "x");
        spinners.output("ghost", "x");
        assert_eq!(spinners.stop("ghost"), None);
        assert_eq!(spinners.succeed("ghost", None), None);
        assert_eq!(spinners.fail("ghost", None), None);
        assert!(target.frames().is_empty());
        tc.assert_line_count(0);
    }

    #[test]
    fn test_stop_ends_without_glyph() {
        let (logger, _, target) = live_logger();
        let spinners = logger.spinners();
        spinners.start("w", "Watching").unwrap();
        assert_eq!(spinners.stop("w"), Some(RunOutcome::Resolved(Verdict::Stop)));
        assert_eq!(target.last_frame().as_deref(), Some("  [deploy] Watching"));
    }

    #[test]
    fn test_independent_keys() {
        let (logger, _, _) = live_logger();
        let spinners = logger.spinners();
        spinners.start("a", "A").unwrap();
        spinners.start("b", "B").unwrap();
        assert_eq!(spinners.active_keys(), vec!["a", "b"]);
        spinners.warn("a", None);
        assert_eq!(spinners.active_keys(), vec!["b"]);
        spinners.info("b", Some("noted"));
        assert!(spinners.active_keys().is_empty());
    }

    #[test]
    fn test_live_keys_share_one_task_list() {
        let (logger, _, target) = live_logger();
        let spinners = logger.spinners();
        spinners.start("build", "Building").unwrap();
        spinners.start("test", "Testing").unwrap();
        assert_eq!(
            target.last_frame().as_deref(),
            Some("⠋ [deploy] Building\n⠋ [deploy] Testing")
        );

        spinners.succeed("build", Some("Built"));
        assert_eq!(
            target.last_frame().as_deref(),
            Some("✔ [deploy] Built\n⠋ [deploy] Testing")
        );

        spinners.fail("test", None);
        assert_eq!(
            target.last_frame().as_deref(),
            Some("✔ [deploy] Built\n✖ [deploy] Failed")
        );
        assert_eq!(target.cleared().first(), Some(&0));
        assert!(target.cleared().iter().skip(2).all(|&n| n == 2));
        assert!(!target.cursor_hidden());
    }

    #[test]
    fn test_ci_start_text_is_emitted_before_quick_completion() {
        let tc = TestConsole::new();
        let logger = Logger::builder()
            .prefix("deploy")
            .environment(Environment::from_vars([("CI", "1")]))
            .config(
                LoggerConfig::new()
                    .spinners(true)
                    .force_color(false)
                    .with_frame_interval(Duration::from_secs(60)),
            )
            .registry(Arc::new(PrefixRegistry::new()))
            .console(tc.console())
            .build();
        assert!(logger.capabilities().ci);

        logger.spinners().start("d", "Deploying").unwrap();
        logger.spinners().succeed("d", Some("Done"));

        assert_eq!(
            tc.output(),
            vec!["⠋ [deploy] Deploying", "⠋ [deploy] Done", "✔ [deploy] Done"]
        );
    }

    #[test]
    fn test_default_key_handle() {
        let (logger, _, _) = live_logger();
        let spinner = logger.spinner();
        assert_eq!(spinner.key(), "deploy");
        spinner.start("Working").unwrap();
        assert!(spinner.start("Again").is_err());
        assert!(spinner.succeed(None).is_some());
        assert!(!spinner.is_active());
    }

    #[test]
    fn test_fallback_logs_plain_lines() {
        let (logger, tc) = fallback_logger();
        let spinners = logger.spinners();
        spinners.start("job", "Indexing").unwrap();
        spinners.update("job", "Indexing 50%");
        spinners.succeed("job", None);
        spinners.start("job", "Retry").unwrap();
        spinners.fail("job", Some("Gave up"));
        spinners.start("job", "Quiet").unwrap();
        spinners.stop("job");

        assert_eq!(
            tc.output(),
            vec!["> TASK    Indexing", "> TASK    Indexing 50%", "v SUCCESS Done", "> TASK    Retry", "> TASK    Quiet"]
        );
        assert_eq!(tc.stderr(), vec!["x ERROR   Gave up"]);
    }

    #[test]
    fn test_fallback_still_enforces_exclusivity() {
        let (logger, _) = fallback_logger();
        let spinners = logger.spinners();
        spinners.start("k", "a").unwrap();
        assert!(spinners.start("k", "b").is_err());
    }

    #[test]
    fn test_json_mode_never_animates() {
        let tc = TestConsole::new().with_terminal(true);
        let logger = Logger::builder()
            .environment(Environment::from_vars([("LOGLINE_JSON", "1")]))
            .registry(Arc::new(PrefixRegistry::new()))
            .console(tc.console())
            .build();
        logger.spinners().start("j", "🚀 Shipping").unwrap();
        logger.spinners().succeed("j", None);

        let lines = tc.output();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["level"], "task");
        assert_eq!(first["message"], "Shipping");
    }
}
