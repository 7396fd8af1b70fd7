//! Level theme table.
//!
//! Every [`Level`] maps to one immutable [`ThemeEntry`]. Entries are resolved
//! against the current capabilities at format time by [`get_theme`].

use std::fmt;
use std::str::FromStr;

use console::{Color, Style};

use crate::error::LoglineError;

/// Width the level label is padded to so message columns line up.
pub const LABEL_WIDTH: usize = 7;

/// Semantic log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
    Success,
    Title,
    Task,
    Plain,
}

impl Level {
    pub const ALL: [Level; 9] = [
        Level::Error,
        Level::Warn,
        Level::Info,
        Level::Debug,
        Level::Trace,
        Level::Success,
        Level::Title,
        Level::Task,
        Level::Plain,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
            Self::Success => "success",
            Self::Title => "title",
            Self::Task => "task",
            Self::Plain => "plain",
        }
    }

    /// Verbosity rank; lower is more severe. Presentation levels rank as info.
    #[must_use]
    pub fn severity(&self) -> u8 {
        match self {
            Self::Error => 1,
            Self::Warn => 2,
            Self::Debug => 4,
            Self::Trace => 5,
            Self::Info | Self::Success | Self::Title | Self::Task | Self::Plain => 3,
        }
    }

    /// Whether a line at this level passes a `min` verbosity threshold.
    #[must_use]
    pub fn is_enabled_at(&self, min: Level) -> bool {
        self.severity() <= min.severity()
    }

    /// The static theme entry for this level.
    #[must_use]
    pub fn entry(&self) -> &'static ThemeEntry {
        match self {
            Self::Error => &ERROR,
            Self::Warn => &WARN,
            Self::Info => &INFO,
            Self::Debug => &DEBUG,
            Self::Trace => &TRACE,
            Self::Success => &SUCCESS,
            Self::Title => &TITLE,
            Self::Task => &TASK,
            Self::Plain => &PLAIN,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = LoglineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            "success" => Ok(Self::Success),
            "title" => Ok(Self::Title),
            "task" => Ok(Self::Task),
            "plain" => Ok(Self::Plain),
            _ => Err(LoglineError::UnknownLevel(s.to_string())),
        }
    }
}

/// Visual identity of one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeEntry {
    pub symbol: &'static str,
    pub fallback: &'static str,
    pub label: &'static str,
    pub color: Option<Color>,
}

const ERROR: ThemeEntry = ThemeEntry {
    symbol: "✖",
    fallback: "x",
    label: "ERROR",
    color: Some(Color::Red),
};
const WARN: ThemeEntry = ThemeEntry {
    symbol: "⚠",
    fallback: "!",
    label: "WARN",
    color: Some(Color::Yellow),
};
const INFO: ThemeEntry = ThemeEntry {
    symbol: "ℹ",
    fallback: "i",
    label: "INFO",
    color: Some(Color::Cyan),
};
const DEBUG: ThemeEntry = ThemeEntry {
    symbol: "●",
    fallback: "*",
    label: "DEBUG",
    color: Some(Color::Magenta),
};
const TRACE: ThemeEntry = ThemeEntry {
    symbol: "→",
    fallback: ".",
    label: "TRACE",
    color: Some(Color::Color256(8)),
};
const SUCCESS: ThemeEntry = ThemeEntry {
    symbol: "✔",
    fallback: "v",
    label: "SUCCESS",
    color: Some(Color::Green),
};
const TITLE: ThemeEntry = ThemeEntry {
    symbol: "◆",
    fallback: "#",
    label: "TITLE",
    color: Some(Color::Blue),
};
const TASK: ThemeEntry = ThemeEntry {
    symbol: "❯",
    fallback: ">",
    label: "TASK",
    color: Some(Color::Cyan),
};
const PLAIN: ThemeEntry = ThemeEntry {
    symbol: "",
    fallback: "",
    label: "",
    color: None,
};

/// Per-level overrides; `None` fields keep the default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThemeOverrides {
    pub symbol: Option<String>,
    pub label: Option<String>,
    pub color: Option<Color>,
}

impl ThemeOverrides {
    #[must_use]
    pub fn symbol(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }
}

/// A theme entry resolved against capabilities and overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTheme {
    pub symbol: String,
    pub label: String,
    pub color: Option<Color>,
}

impl ResolvedTheme {
    /// Apply the theme color to `text` when colors are enabled.
    #[must_use]
    pub fn paint(&self, text: &str, use_colors: bool) -> String {
        paint(text, self.style(), use_colors)
    }

    /// Base style for this theme: its color, nothing else.
    #[must_use]
    pub fn style(&self) -> Style {
        match self.color {
            Some(color) => Style::new().fg(color),
            None => Style::new(),
        }
    }
}

/// Render `text` with `style`, or return it untouched when colors are off.
#[must_use]
pub fn paint(text: &str, style: Style, use_colors: bool) -> String {
    if !use_colors || text.is_empty() {
        return text.to_string();
    }
    style.force_styling(true).apply_to(text).to_string()
}

/// Resolve the theme for `level`.
///
/// Symbol order: icons disabled ⇒ `""`; explicit override symbol; ASCII
/// fallback when Unicode is unsupported; the Unicode symbol.
#[must_use]
pub fn get_theme(
    level: Level,
    overrides: Option<&ThemeOverrides>,
    unicode: bool,
    icons: bool,
) -> ResolvedTheme {
    let entry = level.entry();

    let symbol = if !icons {
        String::new()
    } else if let Some(symbol) = overrides.and_then(|o| o.symbol.as_ref()) {
        symbol.clone()
    } else if !unicode {
        entry.fallback.to_string()
    } else {
        entry.symbol.to_string()
    };

    ResolvedTheme {
        symbol,
        label: overrides
            .and_then(|o| o.label.clone())
            .unwrap_or_else(|| entry.label.to_string()),
        color: overrides.and_then(|o| o.color).or(entry.color),
    }
}

/// Resolve a theme by level name; unknown names are an error.
pub fn get_theme_by_name(
    name: &str,
    overrides: Option<&ThemeOverrides>,
    unicode: bool,
    icons: bool,
) -> Result<ResolvedTheme, LoglineError> {
    let level = name.parse::<Level>()?;
    Ok(get_theme(level, overrides, unicode, icons))
}
