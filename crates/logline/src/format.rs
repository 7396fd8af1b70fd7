//! Message formatting.
//!
//! [`MessageFormatter::format`] composes one human-readable line from a
//! [`FormatRequest`]:
//!
//! ```text
//! [14:30:45] ✔ SUCCESS [deploy]  Released v1.2.0 {"tag":"v1.2.0"}
//! ```
//!
//! Every segment is optional. Segments are joined with single spaces and the
//! result is trimmed, so a request that carries only a message formats to
//! exactly that message. [`MessageFormatter::format_json`] replaces the whole
//! layout with one JSON object per line.

use std::fmt;
use std::sync::Arc;

use console::{Style, measure_text_width};
use serde_json::{Map, Value};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::config::TimestampFormat;
use crate::emoji::strip_emojis;
use crate::logging::targets;
use crate::theme::{LABEL_WIDTH, Level, ResolvedTheme, paint};
use crate::value::{LogValue, opaque_placeholder};

/// Source of the current time for timestamp segments.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> OffsetDateTime;
}

/// Wall clock, UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// `YYYY-MM-DDTHH:MM:SS.sssZ` in UTC.
#[must_use]
pub fn iso_timestamp(dt: OffsetDateTime) -> String {
    let format =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");
    dt.to_offset(UtcOffset::UTC)
        .format(&format)
        .unwrap_or_default()
}

/// `HH:MM:SS` in UTC.
#[must_use]
pub fn clock_timestamp(dt: OffsetDateTime) -> String {
    let format = format_description!("[hour]:[minute]:[second]");
    dt.to_offset(UtcOffset::UTC)
        .format(&format)
        .unwrap_or_default()
}

/// Everything one formatted line depends on.
///
/// Defaults describe a bare line: no timestamp, no level segment, no prefix,
/// no colors, no emoji stripping.
#[derive(Debug, Clone)]
pub struct FormatRequest<'a> {
    pub level: Level,
    pub theme: Option<ResolvedTheme>,
    pub prefix: Option<&'a str>,
    pub max_prefix_length: usize,
    pub message: &'a str,
    pub args: &'a [LogValue],
    pub timestamp: TimestampFormat,
    pub use_colors: bool,
    pub strip_emojis: bool,
    pub include_level: bool,
    pub include_prefix: bool,
}

impl<'a> FormatRequest<'a> {
    #[must_use]
    pub fn new(message: &'a str) -> Self {
        Self {
            level: Level::Plain,
            theme: None,
            prefix: None,
            max_prefix_length: 0,
            message,
            args: &[],
            timestamp: TimestampFormat::Off,
            use_colors: false,
            strip_emojis: false,
            include_level: false,
            include_prefix: false,
        }
    }

    #[must_use]
    pub fn level(mut self, level: Level, theme: ResolvedTheme) -> Self {
        self.level = level;
        self.theme = Some(theme);
        self.include_level = true;
        self
    }

    /// Bracketed prefix padded to `max_len` (the registry's maximum).
    #[must_use]
    pub fn prefix(mut self, prefix: &'a str, max_len: usize) -> Self {
        self.prefix = Some(prefix);
        self.max_prefix_length = max_len;
        self.include_prefix = true;
        self
    }

    #[must_use]
    pub fn args(mut self, args: &'a [LogValue]) -> Self {
        self.args = args;
        self
    }

    #[must_use]
    pub fn timestamp(mut self, timestamp: TimestampFormat) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    #[must_use]
    pub fn strip_emojis(mut self, strip: bool) -> Self {
        self.strip_emojis = strip;
        self
    }
}

/// Composes log lines; holds only the clock.
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    clock: Arc<dyn Clock>,
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Format one human-readable line.
    #[must_use]
    pub fn format(&self, request: &FormatRequest<'_>) -> String {
        let mut segments: Vec<String> = Vec::with_capacity(4);

        if let Some(ts) = self.timestamp_segment(request.timestamp, request.use_colors) {
            segments.push(ts);
        }

        if request.include_level {
            if let Some(theme) = &request.theme {
                if let Some(level) = level_segment(theme, request.use_colors) {
                    segments.push(level);
                }
            }
        }

        if request.include_prefix {
            if let Some(prefix) = request.prefix.filter(|p| !p.is_empty()) {
                segments.push(prefix_segment(
                    prefix,
                    request.max_prefix_length,
                    request.use_colors,
                ));
            }
        }

        let body = message_segment(request);
        if !body.is_empty() {
            segments.push(body);
        }

        segments.join(" ").trim().to_string()
    }

    /// Timestamp plus padded prefix, the leading columns shared by every line
    /// of a logger.
    #[must_use]
    pub fn format_basic_prefix(
        &self,
        prefix: &str,
        max_len: usize,
        show_timestamp: bool,
        use_colors: bool,
    ) -> String {
        let mut segments = Vec::with_capacity(2);
        if show_timestamp {
            if let Some(ts) = self.timestamp_segment(TimestampFormat::Time, use_colors) {
                segments.push(ts);
            }
        }
        if !prefix.is_empty() {
            segments.push(prefix_segment(prefix, max_len, use_colors));
        }
        segments.join(" ")
    }

    /// One JSON object: `level`, `message`, `prefix`, `timestamp`, then the
    /// arguments. Object arguments are flattened into the record; a key that
    /// is already taken becomes `arg{i}_{key}`. Other arguments land under
    /// `arg{i}`. Emoji are always stripped from the message and from string
    /// arguments.
    #[must_use]
    pub fn format_json(&self, request: &FormatRequest<'_>) -> String {
        let mut record = Map::new();
        record.insert("level".into(), Value::String(request.level.as_str().into()));
        record.insert(
            "message".into(),
            Value::String(strip_emojis(request.message).into_owned()),
        );
        record.insert(
            "prefix".into(),
            request
                .prefix
                .filter(|p| !p.is_empty())
                .map_or(Value::Null, |p| Value::String(p.to_string())),
        );
        record.insert(
            "timestamp".into(),
            Value::String(iso_timestamp(self.clock.now())),
        );

        for (i, arg) in request.args.iter().enumerate() {
            match arg.to_json() {
                Value::Object(fields) if arg.is_plain_object() => {
                    for (key, value) in fields {
                        let key = if record.contains_key(&key) {
                            format!("arg{i}_{key}")
                        } else {
                            key
                        };
                        record.insert(key, value);
                    }
                }
                Value::String(s) => {
                    record.insert(
                        format!("arg{i}"),
                        Value::String(strip_emojis(&s).into_owned()),
                    );
                }
                other => {
                    record.insert(format!("arg{i}"), other);
                }
            }
        }

        match serde_json::to_string(&Value::Object(record)) {
            Ok(line) => line,
            Err(err) => {
                log::debug!(target: targets::FORMAT, "json record failed to serialize: {err}");
                opaque_placeholder("Object")
            }
        }
    }

    fn timestamp_segment(&self, format: TimestampFormat, use_colors: bool) -> Option<String> {
        let text = match format {
            TimestampFormat::Off => return None,
            TimestampFormat::Time => clock_timestamp(self.clock.now()),
            TimestampFormat::Iso => iso_timestamp(self.clock.now()),
        };
        Some(paint(&format!("[{text}]"), Style::new().dim(), use_colors))
    }
}

fn level_segment(theme: &ResolvedTheme, use_colors: bool) -> Option<String> {
    let symbol = paint(&theme.symbol, theme.style(), use_colors);
    let label = if theme.label.is_empty() {
        String::new()
    } else {
        let padded = format!("{:<width$}", theme.label, width = LABEL_WIDTH);
        paint(&padded, theme.style().bold(), use_colors)
    };

    match (symbol.is_empty(), label.is_empty()) {
        (true, true) => None,
        (false, true) => Some(symbol),
        (true, false) => Some(label),
        (false, false) => Some(format!("{symbol} {label}")),
    }
}

fn prefix_segment(prefix: &str, max_len: usize, use_colors: bool) -> String {
    let bracketed = format!("[{prefix}]");
    let pad = (max_len + 2).saturating_sub(measure_text_width(&bracketed));
    let padded = format!("{bracketed}{}", " ".repeat(pad));
    paint(&padded, Style::new().dim(), use_colors)
}

fn message_style(level: Level, theme: Option<&ResolvedTheme>) -> Option<Style> {
    let base = theme.map_or_else(Style::new, ResolvedTheme::style);
    match level {
        Level::Error | Level::Success => Some(base.bold()),
        Level::Warn | Level::Title | Level::Task | Level::Plain => Some(base),
        Level::Trace => Some(Style::new().dim()),
        Level::Info | Level::Debug => None,
    }
}

fn message_segment(request: &FormatRequest<'_>) -> String {
    let message = if request.strip_emojis {
        strip_emojis(request.message)
    } else {
        request.message.into()
    };

    let mut body = match message_style(request.level, request.theme.as_ref()) {
        Some(style) => paint(&message, style, request.use_colors),
        None => message.into_owned(),
    };

    for arg in request.args {
        let text = match arg {
            LogValue::String(s) if request.strip_emojis => strip_emojis(s).into_owned(),
            other => other.display_inline(),
        };
        body.push(' ');
        body.push_str(&text);
    }

    body
}
