//! Integration tests for logline component interoperability.
//!
//! These tests verify that components work correctly together at their boundaries:
//! - Environment detection affecting formatting end to end
//! - Loggers sharing one prefix registry
//! - Renderer + console interaction, interactive and CI
//! - Spinner façade driving the renderer

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use logline::detection::supports_color;
use logline::format::{FixedClock, FormatRequest};
use logline::renderer::{SubscriptionId, TaskListener};
use logline::testing::{RecordingTarget, TestConsole};
use logline::{
    Environment, Level, LogValue, Logger, LoggerConfig, LoglineError, MessageFormatter,
    ObjectRef, PrefixRegistry, RenderOptions, RunOutcome, TaskNode, TaskRenderer, Verdict,
    get_theme, get_theme_by_name, safe_json_stringify, strip_emojis,
};
use logline::task::Task;
use time::macros::datetime;

fn plain_env() -> Environment {
    Environment::from_vars([("LOGLINE_DISABLE_CI", "1")])
}

fn logger(prefix: &str, registry: &Arc<PrefixRegistry>, tc: &TestConsole) -> Logger {
    Logger::builder()
        .prefix(prefix)
        .environment(plain_env())
        .registry(Arc::clone(registry))
        .console(tc.console())
        .build()
}

// ============================================================================
// Formatting
// ============================================================================

#[test]
fn test_basic_prefix_with_fixed_clock() {
    let formatter =
        MessageFormatter::with_clock(Arc::new(FixedClock(datetime!(2024-03-01 14:30:45 UTC))));
    let out = formatter.format_basic_prefix("app", 15, true, false);
    assert!(out.starts_with("[14:30:45]"));
    assert!(out.contains("[app]"));
    assert!(!out.contains("\u{1b}["));
}

#[test]
fn test_bare_message_formats_to_itself() {
    let formatter = MessageFormatter::new();
    assert_eq!(formatter.format(&FormatRequest::new("hi")), "hi");
}

#[test]
fn test_basic_prefix_grows_with_registered_width() {
    let formatter = MessageFormatter::new();
    let mut previous = 0;
    for max in [3, 8, 15, 40] {
        let len = formatter.format_basic_prefix("app", max, false, false).len();
        assert!(len >= previous);
        previous = len;
    }
}

#[test]
fn test_message_column_aligned_across_loggers() {
    let tc = TestConsole::new();
    let registry = Arc::new(PrefixRegistry::new());
    let loggers: Vec<Logger> = ["a", "deploy", "scheduler-worker"]
        .iter()
        .map(|p| logger(p, &registry, &tc))
        .collect();

    for log in &loggers {
        log.info("MSG");
    }

    let columns: Vec<usize> = tc
        .output()
        .iter()
        .map(|line| line.find("MSG").unwrap())
        .collect();
    assert_eq!(columns.len(), 3);
    assert!(columns.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_no_color_output_has_no_ansi() {
    let tc = TestConsole::new();
    let env = Environment::from_vars([("NO_COLOR", "1"), ("LOGLINE_FORCE_COLOR", "1")]).with_tty(true);
    assert!(!supports_color(&env));

    let log = Logger::builder()
        .prefix("app")
        .environment(env)
        .config(LoggerConfig::new().with_min_level(Level::Trace))
        .registry(Arc::new(PrefixRegistry::new()))
        .console(tc.console())
        .build();
    for level in Level::ALL {
        log.log_with(level, "message", &[LogValue::object([("k", "v")])]);
    }

    assert_eq!(tc.all().len(), Level::ALL.len());
    assert!(tc.raw_all().iter().all(|line| !line.contains("\u{1b}[")));
}

#[test]
fn test_circular_args_never_panic() {
    let tc = TestConsole::new();
    let log = logger("app", &Arc::new(PrefixRegistry::new()), &tc);

    let node = ObjectRef::new();
    node.insert("name", "root");
    node.insert("self", node.clone());
    let arg = LogValue::Object(node);

    let json: serde_json::Value = serde_json::from_str(&safe_json_stringify(&arg)).unwrap();
    assert_eq!(json["self"], "[Circular]");

    log.log_with(Level::Info, "state", &[arg]);
    tc.assert_contains(r#"state {"name":"root","self":"[Circular]"}"#);
}

#[test]
fn test_emoji_stripping_is_idempotent() {
    for text in ["plain text", "ship it 🚀 now", "👨‍👩‍👧 family", "✨✨"] {
        let once = strip_emojis(text).into_owned();
        assert_eq!(strip_emojis(&once), once);
    }
    assert_eq!(strip_emojis("plain text"), "plain text");
}

#[test]
fn test_theme_lookup() {
    let a = get_theme(Level::Error, None, true, true);
    let b = get_theme(Level::Error, None, true, true);
    assert_eq!((a.symbol.as_str(), a.label.as_str()), (b.symbol.as_str(), b.label.as_str()));

    let err = get_theme_by_name("eror", None, true, true).unwrap_err();
    assert!(matches!(err, LoglineError::UnknownLevel(ref name) if name == "eror"));
}

// ============================================================================
// Task rendering
// ============================================================================

/// A task node owned by some other engine, driven by flags.
#[derive(Default)]
struct ExternalNode {
    failed: Mutex<bool>,
}

impl TaskNode for ExternalNode {
    fn title(&self) -> String {
        "Build".to_string()
    }

    fn set_title(&self, _title: &str) {}

    fn is_enabled(&self) -> bool {
        true
    }

    fn is_started(&self) -> bool {
        true
    }

    fn is_completed(&self) -> bool {
        !self.has_failed()
    }

    fn has_failed(&self) -> bool {
        *self.failed.lock().unwrap()
    }

    fn is_skipped(&self) -> bool {
        false
    }

    fn output(&self) -> Option<String> {
        None
    }

    fn subtasks(&self) -> Vec<Arc<dyn TaskNode>> {
        Vec::new()
    }

    fn subscribe(&self, _listener: TaskListener) -> SubscriptionId {
        SubscriptionId(0)
    }

    fn unsubscribe(&self, _id: SubscriptionId) {}
}

fn quiet_options() -> RenderOptions {
    let mut options = RenderOptions::new(Arc::new(PrefixRegistry::new()));
    options.frame_interval = Duration::from_secs(60);
    options
}

#[test]
fn test_renderer_accepts_foreign_nodes() {
    let tc = TestConsole::new();
    let node = Arc::new(ExternalNode::default());
    let renderer = TaskRenderer::for_console(
        vec![Arc::clone(&node) as Arc<dyn TaskNode>],
        quiet_options(),
        &tc.console(),
    );

    let out = renderer.build_output(false);
    assert!(out.contains('✔'));
    assert!(out.contains("Build"));

    *node.failed.lock().unwrap() = true;
    let out = renderer.build_output(false);
    assert!(out.contains('✖'));
    assert!(!out.contains('✔'));
}

#[test]
fn test_interactive_render_through_console() {
    let target = RecordingTarget::new();
    let tc = TestConsole::new().with_terminal(true).with_repaint_target(target.clone());
    let parent = Task::new("Release");
    let child = Task::new("Upload");
    parent.add_subtask(Arc::clone(&child));

    let session = TaskRenderer::for_console(
        vec![Arc::clone(&parent) as Arc<dyn TaskNode>],
        quiet_options(),
        &tc.console(),
    )
    .render();
    parent.start();
    child.start();
    child.set_output("12 files");
    child.complete();
    parent.complete();
    session.end();

    assert_eq!(
        target.last_frame().as_deref(),
        Some("✔ Release\n  ✔ Upload")
    );
    assert!(!target.cursor_hidden());
    tc.assert_line_count(0);
}

#[test]
fn test_ci_throttle_emits_churn_within_window() {
    let tc = TestConsole::new();
    let task = Task::new("Build");
    task.start();

    let mut options = RenderOptions::new(Arc::new(PrefixRegistry::new()));
    options.ci = true;
    options.frame_interval = Duration::from_millis(10);
    options.ci_throttle = Duration::from_millis(100);
    let session = TaskRenderer::for_console(
        vec![Arc::clone(&task) as Arc<dyn TaskNode>],
        options,
        &tc.console(),
    )
    .render();

    let first = tc.output().len();
    thread::sleep(Duration::from_millis(600));
    let later = tc.output().len();
    assert!(later > first, "no repaint within throttle window: {:?}", tc.output());

    task.complete();
    session.end();
    assert_eq!(tc.output().last().map(String::as_str), Some("✔ Build"));
}

// ============================================================================
// Spinners
// ============================================================================

fn live_logger(prefix: &str) -> (Logger, TestConsole, RecordingTarget) {
    let target = RecordingTarget::new();
    let tc = TestConsole::new().with_repaint_target(target.clone());
    let log = Logger::builder()
        .prefix(prefix)
        .environment(plain_env())
        .config(
            LoggerConfig::new()
                .spinners(true)
                .with_frame_interval(Duration::from_secs(60)),
        )
        .registry(Arc::new(PrefixRegistry::new()))
        .console(tc.console())
        .build();
    (log, tc, target)
}

#[test]
fn test_spinner_succeed_frees_key_and_updates_title() {
    let (log, _tc, target) = live_logger("ops");
    let spinners = log.spinners();

    spinners.start("deploy", "Deploying").unwrap();
    let outcome = spinners.succeed("deploy", Some("Done"));
    assert_eq!(outcome, Some(RunOutcome::Resolved(Verdict::Success)));
    assert!(!spinners.is_active("deploy"));

    let last = target.last_frame().unwrap();
    assert!(last.contains('✔'));
    assert!(last.ends_with("Done"));

    spinners.start("deploy", "Again").unwrap();
    spinners.stop("deploy");
}

#[test]
fn test_spinner_key_exclusivity() {
    let (log, _tc, _target) = live_logger("ops");
    let spinner = log.spinner();
    spinner.start("first").unwrap();

    let err = spinner.start("second").unwrap_err();
    assert!(err.to_string().contains("ops"));

    assert_eq!(
        spinner.fail(Some("Broke")),
        Some(RunOutcome::Rejected("Broke".to_string()))
    );
    spinner.start("third").unwrap();
    spinner.info(None);
}

#[test]
fn test_spinner_fallback_without_terminal() {
    let tc = TestConsole::new();
    let log = Logger::builder()
        .prefix("ops")
        .environment(plain_env())
        .config(LoggerConfig::new().force_unicode(false))
        .registry(Arc::new(PrefixRegistry::new()))
        .console(tc.console())
        .build();

    let spinner = log.spinner();
    spinner.start("Deploying").unwrap();
    assert_eq!(
        spinner.warn(Some("Partial")),
        Some(RunOutcome::Resolved(Verdict::Warn))
    );
    assert!(!spinner.is_active());

    assert_eq!(tc.output(), vec!["> TASK    [ops] Deploying"]);
    assert_eq!(tc.stderr(), vec!["! WARN    [ops] Partial"]);
}

#[test]
fn test_spinners_from_two_loggers_share_alignment() {
    let tc = TestConsole::new();
    let registry = Arc::new(PrefixRegistry::new());
    let short = logger("db", &registry, &tc);
    let long = logger("migrations", &registry, &tc);

    short.spinner().start("connect").unwrap();
    long.spinner().start("apply").unwrap();
    short.spinner().succeed(None);
    long.spinner().succeed(None);

    let lines = tc.all();
    let col = |needle: &str| {
        lines
            .iter()
            .find(|l| l.ends_with(needle))
            .and_then(|l| l.find(needle))
    };
    assert_eq!(col("connect"), col("apply"));
}
