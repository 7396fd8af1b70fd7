//! `tracing` integration.
//!
//! Provides a tracing `Layer` and builder that write events as logline
//! lines. Event fields other than `message` (plus the span path, under
//! `span`) become one object argument, so human lines end in compact JSON
//! and JSON lines carry the fields at the top level.

use std::fmt;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

use super::bridge::{logger_builder, with_parts};
use super::targets;
use crate::console::LoglineConsole;
use crate::detection::Environment;
use crate::format::Clock;
use crate::logger::LoggerCore;
use crate::prefix::PrefixRegistry;
use crate::theme::Level;
use crate::value::{LogValue, ObjectRef};

fn level_from_tracing(level: tracing::Level) -> Level {
    match level {
        tracing::Level::ERROR => Level::Error,
        tracing::Level::WARN => Level::Warn,
        tracing::Level::INFO => Level::Info,
        tracing::Level::DEBUG => Level::Debug,
        _ => Level::Trace,
    }
}

/// A tracing layer that writes events through logline's formatter.
pub struct LoglineLayer {
    core: LoggerCore,
    show_targets: bool,
}

impl fmt::Debug for LoglineLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoglineLayer")
            .field("prefix", &self.core.prefix)
            .field("show_targets", &self.show_targets)
            .finish_non_exhaustive()
    }
}

impl LoglineLayer {
    /// Absorbed write failures so far.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.core.boundary.error_count()
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    fields: ObjectRef,
}

impl FieldCollector {
    fn record_value(&mut self, field: &Field, value: LogValue) {
        if field.name() == "message" {
            if self.message.is_none() {
                self.message = Some(value.display_inline());
            }
        } else {
            self.fields.insert(field.name(), value);
        }
    }
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record_value(field, LogValue::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_value(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, value.into());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field, value.into());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_value(field, LogValue::error(value));
    }
}

impl<S> Layer<S> for LoglineLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if targets::is_internal(metadata.target()) {
            return;
        }

        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        if let Some(scope) = ctx.event_scope(event) {
            let spans: Vec<&str> = scope.from_root().map(|span| span.name()).collect();
            if !spans.is_empty() {
                collector.fields.insert("span", spans.join("::"));
            }
        }

        let message = collector
            .message
            .unwrap_or_else(|| metadata.name().to_string());
        let args = if collector.fields.is_empty() {
            Vec::new()
        } else {
            vec![LogValue::Object(collector.fields)]
        };

        let prefix = if self.show_targets {
            self.core.registry.register(metadata.target());
            Some(metadata.target())
        } else {
            self.core.prefix.as_deref()
        };
        self.core.emit_with_prefix(
            level_from_tracing(*metadata.level()),
            prefix,
            &message,
            &args,
        );
    }
}

/// Builder for a tracing subscriber writing logline lines.
#[derive(Debug)]
pub struct LoglineSubscriberBuilder {
    level_filter: LevelFilter,
    prefix: Option<String>,
    show_timestamps: Option<bool>,
    json: Option<bool>,
    environment: Option<Environment>,
    registry: Option<Arc<PrefixRegistry>>,
    console: Option<Arc<LoglineConsole>>,
    clock: Option<Arc<dyn Clock>>,
}

impl Default for LoglineSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoglineSubscriberBuilder {
    /// Create a new builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            level_filter: LevelFilter::INFO,
            prefix: None,
            show_timestamps: None,
            json: None,
            environment: None,
            registry: None,
            console: None,
            clock: None,
        }
    }

    /// Set the minimum log level.
    #[must_use]
    pub fn with_level_filter(mut self, filter: LevelFilter) -> Self {
        self.level_filter = filter;
        self
    }

    /// Use a fixed prefix instead of each event's target.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Toggle timestamp rendering. Unset keeps the environment's choice.
    #[must_use]
    pub fn with_timestamps(mut self, show: bool) -> Self {
        self.show_timestamps = Some(show);
        self
    }

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

    /// Build only the layer, for composing with other layers.
    #[must_use]
    pub fn layer(self) -> LoglineLayer {
        let min_level = self
            .level_filter
            .into_level()
            .map_or(Level::Trace, level_from_tracing);
        let mut builder = logger_builder(
            self.environment,
            self.show_timestamps,
            self.json,
            min_level,
        );
        let show_targets = self.prefix.is_none();
        if let Some(prefix) = self.prefix {
            builder = builder.prefix(prefix);
        }

        LoglineLayer {
            core: with_parts(builder, self.registry, self.console, self.clock).build_core(),
            show_targets,
        }
    }

    /// Build the subscriber without installing it.
    #[must_use]
    pub fn build(self) -> impl Subscriber {
        let filter = self.level_filter;
        tracing_subscriber::registry()
            .with(filter)
            .with(self.layer())
    }

    /// Build and install as the global subscriber.
    pub fn init(self) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
        let subscriber = self.build();
        tracing::subscriber::set_global_default(subscriber)
    }
}
