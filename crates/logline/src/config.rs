//! Centralized configuration for logline output.
//!
//! `LoggerConfig` is the single point of configuration for a logger,
//! supporting both programmatic and environment variable-based
//! configuration. Environment detection itself lives in
//! [`crate::detection`]; the config only records overrides on top of it.

use std::collections::HashMap;
use std::time::Duration;

use crate::detection::{Capabilities, Disables, Environment};
use crate::logging::targets;
use crate::theme::{Level, ThemeOverrides};

/// How the timestamp segment is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampFormat {
    /// No timestamp segment
    #[default]
    Off,
    /// `HH:MM:SS`
    Time,
    /// `YYYY-MM-DDTHH:MM:SS.sssZ`
    Iso,
}

impl TimestampFormat {
    /// Parse a `LOGLINE_SHOW_TIMESTAMP` value: `true`/`1` mean
    /// [`TimestampFormat::Time`], `iso` means [`TimestampFormat::Iso`],
    /// anything else disables the segment.
    #[must_use]
    pub fn from_flag(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Self::Time,
            "iso" => Self::Iso,
            _ => Self::Off,
        }
    }
}

/// Configuration for one logger and its spinners
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    // Line layout
    /// Timestamp segment format
    pub timestamp: TimestampFormat,
    /// Emit the level label and prefix segments
    pub show_prefix: bool,
    /// Emit theme symbols
    pub show_icons: bool,
    /// Per-level symbol/label/color overrides
    pub theme_overrides: HashMap<Level, ThemeOverrides>,

    // Output mode
    /// One JSON object per line instead of the human layout
    pub json: bool,
    /// Lines more verbose than this are dropped
    pub min_level: Level,

    // Capability overrides (None = detect)
    /// Force colors on or off
    pub color: Option<bool>,
    /// Force Unicode symbols on or off
    pub unicode: Option<bool>,
    /// Force emoji on or off
    pub emoji: Option<bool>,
    /// Force live spinners on or off
    pub spinners: Option<bool>,
    /// Treat the environment as interactive even when CI variables are set
    pub disable_ci: bool,

    // Rendering
    /// Spinner animation period
    pub frame_interval: Duration,
    /// Minimum gap between CI repaints that only change animation frames
    pub ci_throttle: Duration,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            timestamp: TimestampFormat::Off,
            show_prefix: true,
            show_icons: true,
            theme_overrides: HashMap::new(),
            json: false,
            min_level: Level::Info,
            color: None,
            unicode: None,
            emoji: None,
            spinners: None,
            disable_ci: false,
            frame_interval: Duration::from_millis(80),
            ci_throttle: Duration::from_secs(5),
        }
    }
}

impl LoggerConfig {
    /// Create config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create config from environment variables
    ///
    /// # Environment Variables
    ///
    /// | Variable | Values | Description |
    /// |----------|--------|-------------|
    /// | `LOGLINE_SHOW_TIMESTAMP` | true/1/iso | Timestamp segment |
    /// | `LOGLINE_SHOW_PREFIX` | 0/false | Hide level label and prefix |
    /// | `LOGLINE_NO_ICONS` | (set) | Hide theme symbols |
    /// | `LOGLINE_JSON` | (set) | JSON lines |
    /// | `LOGLINE_DISABLE_CI` | (set) | Interactive repaint under CI |
    /// | `LOGLINE_LOG_LEVEL` | error/warn/info/debug/trace | Minimum level |
    ///
    /// Color, Unicode and emoji variables are read by
    /// [`Capabilities::from_env`].
    #[must_use]
    pub fn from_env(env: &Environment) -> Self {
        let mut config = Self::default();

        // Layout
        if let Some(value) = env.var("LOGLINE_SHOW_TIMESTAMP") {
            config.timestamp = TimestampFormat::from_flag(value);
        }
        if env.is_set("LOGLINE_SHOW_PREFIX") && !env.flag("LOGLINE_SHOW_PREFIX") {
            config.show_prefix = false;
        }
        if env.flag("LOGLINE_NO_ICONS") {
            config.show_icons = false;
        }

        // Mode
        config.json = env.flag("LOGLINE_JSON");
        config.disable_ci = env.flag("LOGLINE_DISABLE_CI");

        if let Some(value) = env.var("LOGLINE_LOG_LEVEL") {
            match value.parse::<Level>() {
                Ok(level) => config.min_level = level,
                Err(err) => log::debug!(target: targets::LOGLINE, "ignoring LOGLINE_LOG_LEVEL: {err}"),
            }
        }

        config
    }

    /// Create config from the current process environment
    #[must_use]
    pub fn from_process_env() -> Self {
        Self::from_env(&Environment::current())
    }

    // ─────────────────────────────────────────────────
    // Builder Methods
    // ─────────────────────────────────────────────────

    /// Set the timestamp format
    #[must_use]
    pub fn with_timestamp(mut self, format: TimestampFormat) -> Self {
        self.timestamp = format;
        self
    }

    /// Show or hide the level label and prefix segments
    #[must_use]
    pub fn show_prefix(mut self, show: bool) -> Self {
        self.show_prefix = show;
        self
    }

    /// Hide all theme symbols
    #[must_use]
    pub fn without_icons(mut self) -> Self {
        self.show_icons = false;
        self
    }

    /// Switch to JSON lines
    #[must_use]
    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Set the minimum level
    #[must_use]
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    /// Force colors on or off
    #[must_use]
    pub fn force_color(mut self, enabled: bool) -> Self {
        self.color = Some(enabled);
        self
    }

    /// Force Unicode symbols on or off
    #[must_use]
    pub fn force_unicode(mut self, enabled: bool) -> Self {
        self.unicode = Some(enabled);
        self
    }

    /// Force emoji on or off
    #[must_use]
    pub fn force_emoji(mut self, enabled: bool) -> Self {
        self.emoji = Some(enabled);
        self
    }

    /// Force live spinners on or off
    #[must_use]
    pub fn spinners(mut self, enabled: bool) -> Self {
        self.spinners = Some(enabled);
        self
    }

    /// Ignore CI variables when choosing the repaint strategy
    #[must_use]
    pub fn disable_ci(mut self) -> Self {
        self.disable_ci = true;
        self
    }

    /// Override the theme for one level
    #[must_use]
    pub fn with_theme_override(mut self, level: Level, overrides: ThemeOverrides) -> Self {
        self.theme_overrides.insert(level, overrides);
        self
    }

    /// Set the spinner animation period
    #[must_use]
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Set the CI repaint throttle window
    #[must_use]
    pub fn with_ci_throttle(mut self, throttle: Duration) -> Self {
        self.ci_throttle = throttle;
        self
    }

    // ─────────────────────────────────────────────────
    // Resolution Methods
    // ─────────────────────────────────────────────────

    /// Apply this config's overrides to detected capabilities.
    ///
    /// Overrides only act below the environment's disables: a forced
    /// capability stays off when `disabled` says so. Disabling color also
    /// disables emoji, mirroring `NO_COLOR`.
    #[must_use]
    pub fn capabilities(&self, detected: Capabilities, disabled: Disables) -> Capabilities {
        let color = !disabled.color && self.color.unwrap_or(detected.color);
        let emoji = if disabled.emoji || self.color == Some(false) {
            false
        } else {
            self.emoji.unwrap_or(detected.emoji)
        };

        Capabilities {
            color,
            unicode: !disabled.unicode && self.unicode.unwrap_or(detected.unicode),
            emoji,
            ci: detected.ci && !self.disable_ci,
            icons: detected.icons && self.show_icons,
        }
    }

    /// Overrides for `level`, if any.
    #[must_use]
    pub fn theme_override(&self, level: Level) -> Option<&ThemeOverrides> {
        self.theme_overrides.get(&level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        Environment::from_vars(vars.iter().copied())
    }

    #[test]
    fn test_default_config() {
        let config = LoggerConfig::new();
        assert_eq!(config.timestamp, TimestampFormat::Off);
        assert!(config.show_prefix);
        assert!(config.show_icons);
        assert!(!config.json);
        assert_eq!(config.min_level, Level::Info);
        assert_eq!(config.frame_interval, Duration::from_millis(80));
    }

    #[test]
    fn test_timestamp_flag_values() {
        assert_eq!(TimestampFormat::from_flag("true"), TimestampFormat::Time);
        assert_eq!(TimestampFormat::from_flag("1"), TimestampFormat::Time);
        assert_eq!(TimestampFormat::from_flag("ISO"), TimestampFormat::Iso);
        assert_eq!(TimestampFormat::from_flag("yes"), TimestampFormat::Off);
        assert_eq!(TimestampFormat::from_flag(""), TimestampFormat::Off);
    }

    #[test]
    fn test_from_env() {
        let config = LoggerConfig::from_env(&env(&[
            ("LOGLINE_SHOW_TIMESTAMP", "iso"),
            ("LOGLINE_SHOW_PREFIX", "false"),
            ("LOGLINE_NO_ICONS", "1"),
            ("LOGLINE_JSON", "true"),
            ("LOGLINE_DISABLE_CI", "1"),
            ("LOGLINE_LOG_LEVEL", "debug"),
        ]));
        assert_eq!(config.timestamp, TimestampFormat::Iso);
        assert!(!config.show_prefix);
        assert!(!config.show_icons);
        assert!(config.json);
        assert!(config.disable_ci);
        assert_eq!(config.min_level, Level::Debug);
    }

    #[test]
    fn test_flags_set_to_false_are_off() {
        let config = LoggerConfig::from_env(&env(&[
            ("LOGLINE_JSON", "0"),
            ("LOGLINE_NO_ICONS", "false"),
            ("LOGLINE_SHOW_PREFIX", "1"),
        ]));
        assert!(!config.json);
        assert!(config.show_icons);
        assert!(config.show_prefix);
    }

    #[test]
    fn test_invalid_level_is_ignored() {
        let config = LoggerConfig::from_env(&env(&[("LOGLINE_LOG_LEVEL", "loud")]));
        assert_eq!(config.min_level, Level::Info);
    }

    #[test]
    fn test_builder_pattern() {
        let config = LoggerConfig::new()
            .with_timestamp(TimestampFormat::Time)
            .with_min_level(Level::Trace)
            .force_color(true)
            .spinners(false)
            .with_theme_override(Level::Info, ThemeOverrides::symbol("*"))
            .with_ci_throttle(Duration::from_millis(10));

        assert_eq!(config.timestamp, TimestampFormat::Time);
        assert_eq!(config.min_level, Level::Trace);
        assert_eq!(config.color, Some(true));
        assert_eq!(config.spinners, Some(false));
        assert_eq!(
            config.theme_override(Level::Info).and_then(|o| o.symbol.as_deref()),
            Some("*")
        );
        assert!(config.theme_override(Level::Warn).is_none());
        assert_eq!(config.ci_throttle, Duration::from_millis(10));
    }

    #[test]
    fn test_color_override_cascades_to_emoji() {
        let detected = Capabilities {
            color: true,
            unicode: true,
            emoji: true,
            ci: true,
            icons: true,
        };
        let caps = LoggerConfig::new()
            .force_color(false)
            .force_emoji(true)
            .capabilities(detected, Disables::default());
        assert!(!caps.color);
        assert!(!caps.emoji);

        let caps = LoggerConfig::new()
            .disable_ci()
            .without_icons()
            .capabilities(detected, Disables::default());
        assert!(!caps.ci);
        assert!(!caps.icons);
        assert!(caps.color);
    }

    #[test]
    fn test_forced_capabilities_yield_to_disables() {
        let no_color = env(&[("NO_COLOR", "1"), ("NO_UNICODE", "1")]).with_tty(true);
        let caps = LoggerConfig::new()
            .force_color(true)
            .force_emoji(true)
            .force_unicode(true)
            .capabilities(Capabilities::from_env(&no_color), Disables::from_env(&no_color));
        assert!(!caps.color);
        assert!(!caps.emoji);
        assert!(!caps.unicode);

        let no_emoji = env(&[("NO_EMOJI", "1")]);
        let caps = LoggerConfig::new()
            .force_color(true)
            .force_emoji(true)
            .capabilities(Capabilities::from_env(&no_emoji), Disables::from_env(&no_emoji));
        assert!(caps.color);
        assert!(!caps.emoji);
    }
}
