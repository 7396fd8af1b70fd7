//! `log` facade bridge.
//!
//! Provides a `log` crate compatible logger that writes records as logline
//! lines, with the record target as the prefix.
//!
//! # Usage
//!
//! ```ignore
//! use logline::logging::LoglineLoggerBuilder;
//! use log::Level;
//!
//! LoglineLoggerBuilder::new()
//!     .level(Level::Debug)
//!     .with_timestamps(true)
//!     .init()
//!     .expect("Failed to initialize logger");
//!
//! log::info!(target: "db", "connected");
//! // ℹ INFO    [db] connected
//! ```

use std::sync::Arc;

use log::{LevelFilter, Log, Metadata, Record};

use super::targets;
use crate::config::{LoggerConfig, TimestampFormat};
use crate::console::LoglineConsole;
use crate::detection::Environment;
use crate::format::Clock;
use crate::logger::{LoggerBuilder, LoggerCore};
use crate::prefix::PrefixRegistry;
use crate::theme::Level;

/// Map a `log` level onto the matching logline level.
#[must_use]
pub(crate) fn level_from_log(level: log::Level) -> Level {
    match level {
        log::Level::Error => Level::Error,
        log::Level::Warn => Level::Warn,
        log::Level::Info => Level::Info,
        log::Level::Debug => Level::Debug,
        log::Level::Trace => Level::Trace,
    }
}

/// A `log::Log` implementation writing through logline's formatter.
///
/// Error and warn records go to stderr, everything else to stdout. Records
/// under logline's own [`targets`] are dropped.
#[derive(Debug)]
pub struct LoglineLogger {
    core: LoggerCore,
    min_level: log::Level,
    show_targets: bool,
}

impl LoglineLogger {
    /// Logger for `min_level` with configuration from the environment.
    #[must_use]
    pub fn new(min_level: log::Level) -> Self {
        LoglineLoggerBuilder::new().level(min_level).build()
    }

    #[must_use]
    pub fn builder() -> LoglineLoggerBuilder {
        LoglineLoggerBuilder::new()
    }

    /// Absorbed write failures so far.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.core.boundary.error_count()
    }
}

impl Log for LoglineLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.min_level && !targets::is_internal(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let prefix = if self.show_targets {
            let target = record.target();
            self.core.registry.register(target);
            Some(target)
        } else {
            None
        };
        let message = record.args().to_string();
        self.core
            .emit_with_prefix(level_from_log(record.level()), prefix, &message, &[]);
    }

    fn flush(&self) {}
}

/// Builder for [`LoglineLogger`].
#[derive(Debug)]
pub struct LoglineLoggerBuilder {
    min_level: log::Level,
    show_timestamps: Option<bool>,
    show_targets: bool,
    json: Option<bool>,
    environment: Option<Environment>,
    registry: Option<Arc<PrefixRegistry>>,
    console: Option<Arc<LoglineConsole>>,
    clock: Option<Arc<dyn Clock>>,
}

impl Default for LoglineLoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoglineLoggerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_level: log::Level::Info,
            show_timestamps: None,
            show_targets: true,
            json: None,
            environment: None,
            registry: None,
            console: None,
            clock: None,
        }
    }

    /// Set the minimum log level.
    #[must_use]
    pub fn level(mut self, level: log::Level) -> Self {
        self.min_level = level;
        self
    }

    /// Set the minimum log level from a `LevelFilter`.
    #[must_use]
    pub fn level_filter(mut self, filter: LevelFilter) -> Self {
        self.min_level = filter.to_level().unwrap_or(log::Level::Trace);
        self
    }

    /// Show or hide the `[HH:MM:SS]` column. Unset keeps the environment's choice.
    #[must_use]
    pub fn with_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = Some(show);
        self
    }

    /// Use record targets as line prefixes.
    #[must_use]
    pub fn with_prefix(mut self, show: bool) -> Self {
        self.show_targets = show;
        self
    }

    /// Write JSON lines instead of human-readable ones.
    #[must_use]
    pub fn json(mut self, json: bool) -> Self {
        self.json = Some(json);
        self
    }

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

    /// Build the logger without installing it.
    #[must_use]
    pub fn build(self) -> LoglineLogger {
        let builder = logger_builder(
            self.environment,
            self.show_timestamps,
            self.json,
            level_from_log(self.min_level),
        );
        let core = with_parts(builder, self.registry, self.console, self.clock).build_core();

        LoglineLogger {
            core,
            min_level: self.min_level,
            show_targets: self.show_targets,
        }
    }

    /// Build and install as the global logger.
    ///
    /// Returns an error if a logger has already been set.
    pub fn init(self) -> Result<(), log::SetLoggerError> {
        let level = self.min_level;
        let logger = Box::new(self.build());
        log::set_boxed_logger(logger)?;
        log::set_max_level(level.to_level_filter());
        Ok(())
    }

    /// Build and install, ignoring errors if already set.
    pub fn try_init(self) {
        let _ = self.init();
    }
}

/// A [`LoggerBuilder`] whose configuration comes from `environment` (or the
/// process) with the bridge overrides applied.
pub(crate) fn logger_builder(
    environment: Option<Environment>,
    show_timestamps: Option<bool>,
    json: Option<bool>,
    min_level: Level,
) -> LoggerBuilder {
    let mut config = environment
        .as_ref()
        .map_or_else(LoggerConfig::from_process_env, LoggerConfig::from_env)
        .with_min_level(min_level);
    if let Some(show) = show_timestamps {
        config = config.with_timestamp(if show {
            TimestampFormat::Time
        } else {
            TimestampFormat::Off
        });
    }
    if let Some(json) = json {
        config = config.json(json);
    }

    let builder = LoggerBuilder::new().config(config);
    match environment {
        Some(env) => builder.environment(env),
        None => builder,
    }
}

pub(crate) fn with_parts(
    mut builder: LoggerBuilder,
    registry: Option<Arc<PrefixRegistry>>,
    console: Option<Arc<LoglineConsole>>,
    clock: Option<Arc<dyn Clock>>,
) -> LoggerBuilder {
    if let Some(registry) = registry {
        builder = builder.registry(registry);
    }
    if let Some(console) = console {
        builder = builder.console(console);
    }
    if let Some(clock) = clock {
        builder = builder.clock(clock);
    }
    builder
}
