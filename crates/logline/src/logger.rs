//! Prefixed loggers.
//!
//! A [`Logger`] writes themed, aligned lines for one prefix and owns the
//! spinners started through it. Loggers built against the same
//! [`PrefixRegistry`] pad their prefixes to a common width, so lines from
//! independent loggers line up:
//!
//! ```text
//! ℹ INFO    [db]        connected
//! ✔ SUCCESS [scheduler] 3 jobs queued
//! ```

use std::sync::Arc;

use crate::config::LoggerConfig;
use crate::console::{LoglineConsole, Stream};
use crate::detection::{Capabilities, Disables, Environment};
use crate::error::RenderBoundary;
use crate::format::{Clock, FormatRequest, MessageFormatter};
use crate::prefix::{PrefixRegistry, global_registry};
use crate::renderer::RenderOptions;
use crate::spinner::{Spinner, SpinnerFacade};
use crate::theme::{Level, get_theme};
use crate::value::LogValue;

/// Key used for a logger's own spinner when it has no prefix.
pub const DEFAULT_SPINNER_KEY: &str = "default";

/// Everything needed to format and write a line.
#[derive(Debug)]
pub(crate) struct LoggerCore {
    pub(crate) prefix: Option<String>,
    pub(crate) config: LoggerConfig,
    pub(crate) caps: Capabilities,
    pub(crate) registry: Arc<PrefixRegistry>,
    pub(crate) formatter: MessageFormatter,
    pub(crate) console: Arc<LoglineConsole>,
    pub(crate) boundary: RenderBoundary,
}

impl LoggerCore {
    pub(crate) fn new(
        prefix: Option<String>,
        config: LoggerConfig,
        caps: Capabilities,
        registry: Arc<PrefixRegistry>,
        formatter: MessageFormatter,
        console: Arc<LoglineConsole>,
    ) -> Self {
        if let Some(prefix) = &prefix {
            registry.register(prefix);
        }
        Self {
            prefix,
            config,
            caps,
            registry,
            formatter,
            console,
            boundary: RenderBoundary::new("logger"),
        }
    }

    pub(crate) fn emit(&self, level: Level, message: &str, args: &[LogValue]) {
        self.emit_with_prefix(level, self.prefix.as_deref(), message, args);
    }

    pub(crate) fn emit_with_prefix(
        &self,
        level: Level,
        prefix: Option<&str>,
        message: &str,
        args: &[LogValue],
    ) {
        if !level.is_enabled_at(self.config.min_level) {
            return;
        }
        let line = self.format_line(level, prefix, message, args);
        self.boundary
            .wrap(self.console.write_line(Stream::for_level(level), &line));
    }

    pub(crate) fn format_line(
        &self,
        level: Level,
        prefix: Option<&str>,
        message: &str,
        args: &[LogValue],
    ) -> String {
        let theme = get_theme(
            level,
            self.config.theme_override(level),
            self.caps.unicode,
            self.caps.icons,
        );
        let mut request = FormatRequest::new(message)
            .level(level, theme)
            .args(args)
            .timestamp(self.config.timestamp)
            .colors(self.caps.color)
            .strip_emojis(!self.caps.emoji);
        if let Some(prefix) = prefix {
            request = request.prefix(prefix, self.registry.max_length());
        }
        request.include_level = self.config.show_prefix;
        request.include_prefix = self.config.show_prefix;

        if self.config.json {
            self.formatter.format_json(&request)
        } else {
            self.formatter.format(&request)
        }
    }

    pub(crate) fn spinners_enabled(&self) -> bool {
        !self.config.json
            && self
                .config
                .spinners
                .unwrap_or(self.console.is_terminal() || self.caps.ci)
    }

    pub(crate) fn render_options(&self) -> RenderOptions {
        RenderOptions {
            prefix: self.prefix.clone(),
            registry: Arc::clone(&self.registry),
            show_prefix: self.config.show_prefix,
            use_colors: self.caps.color,
            unicode: self.caps.unicode,
            emoji: self.caps.emoji,
            ci: self.caps.ci,
            frame_interval: self.config.frame_interval,
            ci_throttle: self.config.ci_throttle,
        }
    }
}

/// A logger for one prefix.
///
/// Cloning is cheap; clones share configuration, output and spinners.
#[derive(Debug, Clone)]
pub struct Logger {
    core: Arc<LoggerCore>,
    spinners: Arc<SpinnerFacade>,
}

impl Logger {
    /// Logger for `prefix` with configuration from the environment.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::builder().prefix(prefix).build()
    }

    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    fn from_core(core: LoggerCore) -> Self {
        let key = core
            .prefix
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_SPINNER_KEY.to_string());
        let core = Arc::new(core);
        Self {
            spinners: Arc::new(SpinnerFacade::new(Arc::clone(&core), key)),
            core,
        }
    }

    /// A logger with a new prefix and this logger's configuration and output.
    #[must_use]
    pub fn child(&self, prefix: impl Into<String>) -> Self {
        Self::from_core(LoggerCore::new(
            Some(prefix.into()),
            self.core.config.clone(),
            self.core.caps,
            Arc::clone(&self.core.registry),
            self.core.formatter.clone(),
            Arc::clone(&self.core.console),
        ))
    }

    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.core.prefix.as_deref()
    }

    #[must_use]
    pub fn config(&self) -> &LoggerConfig {
        &self.core.config
    }

    /// Capabilities after configuration overrides.
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.core.caps
    }

    /// Absorbed write failures so far.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.core.boundary.error_count()
    }

    // ─────────────────────────────────────────────────
    // Levels
    // ─────────────────────────────────────────────────

    pub fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }

    pub fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }

    pub fn trace(&self, message: &str) {
        self.log(Level::Trace, message);
    }

    pub fn success(&self, message: &str) {
        self.log(Level::Success, message);
    }

    pub fn title(&self, message: &str) {
        self.log(Level::Title, message);
    }

    pub fn task(&self, message: &str) {
        self.log(Level::Task, message);
    }

    pub fn plain(&self, message: &str) {
        self.log(Level::Plain, message);
    }

    pub fn log(&self, level: Level, message: &str) {
        self.core.emit(level, message, &[]);
    }

    /// Log with extra arguments appended to the message.
    pub fn log_with(&self, level: Level, message: &str, args: &[LogValue]) {
        self.core.emit(level, message, args);
    }

    /// The line `log_with` would write, without writing it.
    #[must_use]
    pub fn format(&self, level: Level, message: &str, args: &[LogValue]) -> String {
        self.core
            .format_line(level, self.core.prefix.as_deref(), message, args)
    }

    // ─────────────────────────────────────────────────
    // Spinners
    // ─────────────────────────────────────────────────

    /// All spinners of this logger, by key.
    #[must_use]
    pub fn spinners(&self) -> &SpinnerFacade {
        &self.spinners
    }

    /// The spinner keyed by this logger's prefix (or `"default"`).
    #[must_use]
    pub fn spinner(&self) -> Spinner<'_> {
        Spinner::new(&self.spinners, self.spinners.default_key())
    }
}

/// Builder for [`Logger`].
///
/// Unset parts come from the process: configuration and capabilities from
/// the environment, the global prefix registry and the global console.
#[derive(Debug, Default)]
pub struct LoggerBuilder {
    prefix: Option<String>,
    config: Option<LoggerConfig>,
    environment: Option<Environment>,
    registry: Option<Arc<PrefixRegistry>>,
    console: Option<Arc<LoglineConsole>>,
    clock: Option<Arc<dyn Clock>>,
}

impl LoggerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Use `config` instead of reading it from the environment.
    #[must_use]
    pub fn config(mut self, config: LoggerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Detect capabilities (and read configuration) from `environment`.
    #[must_use]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    #[must_use]
    pub fn registry(mut self, registry: Arc<PrefixRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn console(mut self, console: Arc<LoglineConsole>) -> Self {
        self.console = Some(console);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn build(self) -> Logger {
        Logger::from_core(self.build_core())
    }

    pub(crate) fn build_core(self) -> LoggerCore {
        let (config, detected, disabled) = match &self.environment {
            Some(env) => (
                self.config.unwrap_or_else(|| LoggerConfig::from_env(env)),
                Capabilities::from_env(env),
                Disables::from_env(env),
            ),
            None => (
                self.config.unwrap_or_else(LoggerConfig::from_process_env),
                Capabilities::detect(),
                Disables::from_env(&Environment::current()),
            ),
        };
        let caps = config.capabilities(detected, disabled);
        let formatter = self
            .clock
            .map_or_else(MessageFormatter::new, MessageFormatter::with_clock);

        LoggerCore::new(
            self.prefix.filter(|p| !p.is_empty()),
            config,
            caps,
            self.registry.unwrap_or_else(global_registry),
            formatter,
            self.console.unwrap_or_else(crate::console::console),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimestampFormat;
    use crate::format::FixedClock;
    use crate::testing::TestConsole;
    use crate::theme::ThemeOverrides;
    use time::macros::datetime;

    fn plain_env() -> Environment {
        Environment::from_vars([("LOGLINE_DISABLE_CI", "1")])
    }

    fn logger(prefix: &str, registry: &Arc<PrefixRegistry>, tc: &TestConsole) -> Logger {
        Logger::builder()
            .prefix(prefix)
            .environment(plain_env())
            .config(LoggerConfig::new().force_unicode(true))
            .registry(Arc::clone(registry))
            .console(tc.console())
            .build()
    }

    #[test]
    fn test_levels_route_to_streams() {
        let tc = TestConsole::new();
        let log = logger("app", &Arc::new(PrefixRegistry::new()), &tc);
        log.info("started");
        log.warn("slow");
        log.error("broken");
        log.success("done");

        assert_eq!(tc.output(), vec!["ℹ INFO    [app] started", "✔ SUCCESS [app] done"]);
        assert_eq!(tc.stderr(), vec!["⚠ WARN    [app] slow", "✖ ERROR   [app] broken"]);
    }

    #[test]
    fn test_alignment_across_loggers() {
        let tc = TestConsole::new();
        let registry = Arc::new(PrefixRegistry::new());
        let short = logger("db", &registry, &tc);
        let long = logger("scheduler", &registry, &tc);
        short.info("a");
        long.info("b");

        let lines = tc.output();
        let col = |line: &str, needle: char| line.chars().position(|c| c == needle);
        assert_eq!(col(&lines[0], 'a'), col(&lines[1], 'b'));
    }

    #[test]
    fn test_min_level_filters_debug() {
        let tc = TestConsole::new();
        let log = logger("app", &Arc::new(PrefixRegistry::new()), &tc);
        log.debug("hidden");
        log.trace("hidden");
        log.title("shown");
        tc.assert_line_count(1);

        let verbose = Logger::builder()
            .environment(plain_env())
            .config(LoggerConfig::new().with_min_level(Level::Trace))
            .registry(Arc::new(PrefixRegistry::new()))
            .console(tc.console())
            .build();
        verbose.trace("visible");
        tc.assert_contains("visible");
    }

    #[test]
    fn test_log_with_args() {
        let tc = TestConsole::new();
        let log = logger("api", &Arc::new(PrefixRegistry::new()), &tc);
        log.log_with(
            Level::Info,
            "request",
            &[LogValue::from("GET"), LogValue::object([("status", 200)])],
        );
        tc.assert_contains(r#"request GET {"status":200}"#);
    }

    #[test]
    fn test_show_prefix_off_hides_label_and_prefix() {
        let tc = TestConsole::new();
        let log = Logger::builder()
            .prefix("app")
            .environment(plain_env().with_var("LOGLINE_SHOW_PREFIX", "false"))
            .registry(Arc::new(PrefixRegistry::new()))
            .console(tc.console())
            .build();
        log.info("bare");
        assert_eq!(tc.output(), vec!["bare"]);
    }

    #[test]
    fn test_timestamps_from_clock() {
        let tc = TestConsole::new();
        let log = Logger::builder()
            .environment(plain_env())
            .config(LoggerConfig::new().with_timestamp(TimestampFormat::Time).without_icons())
            .registry(Arc::new(PrefixRegistry::new()))
            .console(tc.console())
            .clock(Arc::new(FixedClock(datetime!(2024-01-02 03:04:05 UTC))))
            .build();
        log.info("tick");
        assert_eq!(tc.output(), vec!["[03:04:05] INFO    tick"]);
    }

    #[test]
    fn test_no_color_means_no_ansi() {
        let tc = TestConsole::new();
        let log = Logger::builder()
            .prefix("app")
            .environment(
                Environment::from_vars([("NO_COLOR", "1"), ("FORCE_COLOR", "1")]).with_tty(true),
            )
            .registry(Arc::new(PrefixRegistry::new()))
            .console(tc.console())
            .build();
        for level in Level::ALL {
            log.log(level, "🎉 message");
        }
        assert!(!log.capabilities().color);
        assert!(tc.raw_all().iter().all(|line| !line.contains("\u{1b}[")));
        tc.assert_not_contains("🎉");
    }

    #[test]
    fn test_forced_color_emits_ansi() {
        let tc = TestConsole::new();
        let log = Logger::builder()
            .environment(plain_env())
            .config(LoggerConfig::new().force_color(true))
            .registry(Arc::new(PrefixRegistry::new()))
            .console(tc.console())
            .build();
        log.error("boom");
        assert!(tc.raw_stderr()[0].contains("\u{1b}["));
        assert_eq!(tc.stderr(), vec!["✖ ERROR   boom"]);
    }

    #[test]
    fn test_no_color_beats_programmatic_force() {
        let tc = TestConsole::new();
        let log = Logger::builder()
            .environment(Environment::from_vars([("NO_COLOR", "1"), ("LOGLINE_DISABLE_CI", "1")]))
            .config(LoggerConfig::new().force_color(true).force_emoji(true))
            .registry(Arc::new(PrefixRegistry::new()))
            .console(tc.console())
            .build();
        log.error("boom 🎉");

        let caps = log.capabilities();
        assert!(!caps.color);
        assert!(!caps.emoji);
        assert!(!tc.raw_stderr()[0].contains("\u{1b}["));
        assert_eq!(tc.stderr(), vec!["✖ ERROR   boom"]);
    }

    #[test]
    fn test_theme_override() {
        let tc = TestConsole::new();
        let log = Logger::builder()
            .environment(plain_env())
            .config(
                LoggerConfig::new()
                    .with_theme_override(Level::Info, ThemeOverrides::symbol("*").with_label("NOTE")),
            )
            .registry(Arc::new(PrefixRegistry::new()))
            .console(tc.console())
            .build();
        log.info("custom");
        assert_eq!(tc.output(), vec!["* NOTE    custom"]);
    }

    #[test]
    fn test_child_shares_output_and_registry() {
        let tc = TestConsole::new();
        let registry = Arc::new(PrefixRegistry::new());
        let parent = logger("app", &registry, &tc);
        let child = parent.child("app:worker");

        assert_eq!(child.prefix(), Some("app:worker"));
        assert_eq!(registry.max_length(), 10);
        child.info("hi");
        tc.assert_contains("[app:worker] hi");
        assert_eq!(child.spinner().key(), "app:worker");
    }

    #[test]
    fn test_spinner_key_defaults_without_prefix() {
        let tc = TestConsole::new();
        let log = Logger::builder()
            .environment(plain_env())
            .registry(Arc::new(PrefixRegistry::new()))
            .console(tc.console())
            .build();
        assert_eq!(log.spinner().key(), DEFAULT_SPINNER_KEY);
        assert_eq!(log.prefix(), None);
    }

    #[test]
    fn test_json_lines() {
        let tc = TestConsole::new();
        let log = Logger::builder()
            .prefix("svc")
            .environment(plain_env().with_var("LOGLINE_JSON", "1"))
            .registry(Arc::new(PrefixRegistry::new()))
            .console(tc.console())
            .clock(Arc::new(FixedClock(datetime!(2024-01-02 03:04:05 UTC))))
            .build();
        log.warn("disk ✨ low");

        let line: serde_json::Value = serde_json::from_str(&tc.stderr()[0]).unwrap();
        assert_eq!(line["level"], "warn");
        assert_eq!(line["message"], "disk low");
        assert_eq!(line["prefix"], "svc");
        assert_eq!(line["timestamp"], "2024-01-02T03:04:05.000Z");
    }
}
