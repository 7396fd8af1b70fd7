//! Terminal capability detection
//!
//! Answers four independent questions about the running environment: can it
//! show color, Unicode symbols, emoji, and is it a CI runner. Every answer is
//! derived from an [`Environment`] snapshot, so each precedence chain can be
//! exercised without touching the process environment.
//!
//! Precedence, highest first:
//!
//! 1. global standard disables (`NO_COLOR`, `NO_EMOJI`, `NO_UNICODE`)
//! 2. library disables (`LOGLINE_NO_*`)
//! 3. force enables (`FORCE_COLOR`, `LOGLINE_FORCE_*`)
//! 4. auto-detection (TTY, `TERM`, locale, terminal program, platform)

use std::collections::HashMap;
use std::io::IsTerminal;
use std::sync::{PoisonError, RwLock};

/// Environment variables whose presence marks a CI runner.
pub const CI_ENV_VARS: &[&str] = &[
    "CI",
    "CONTINUOUS_INTEGRATION",
    "BUILD_NUMBER",
    "RUN_ID",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
    "BUILDKITE",
    "TEAMCITY_VERSION",
    "TF_BUILD",
    "CODEBUILD_BUILD_ID",
    "DRONE",
    "APPVEYOR",
    "BITBUCKET_BUILD_NUMBER",
];

/// Values of `TERM_PROGRAM` known to render emoji.
const EMOJI_TERMINALS: &[&str] = &[
    "iTerm.app",
    "Apple_Terminal",
    "vscode",
    "WezTerm",
    "Hyper",
    "ghostty",
    "kitty",
    "Tabby",
];

/// Host platform, used for the platform-default branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Platform {
    MacOs,
    Windows,
    #[default]
    Other,
}

impl Platform {
    /// The platform this binary was compiled for.
    #[must_use]
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(windows) {
            Self::Windows
        } else {
            Self::Other
        }
    }
}

/// A read-only snapshot of the inputs capability detection looks at.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
    stdout_tty: bool,
    stderr_tty: bool,
    platform: Platform,
}

impl Environment {
    /// Snapshot the current process environment and standard streams.
    #[must_use]
    pub fn current() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();

        Self {
            vars,
            stdout_tty: std::io::stdout().is_terminal(),
            stderr_tty: std::io::stderr().is_terminal(),
            platform: Platform::current(),
        }
    }

    /// Build an environment from explicit variables.
    ///
    /// Streams are reported as non-TTY and the platform as [`Platform::Other`]
    /// until overridden with [`with_tty`](Self::with_tty) and
    /// [`with_platform`](Self::with_platform).
    #[must_use]
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            stdout_tty: false,
            stderr_tty: false,
            platform: Platform::Other,
        }
    }

    /// Set whether both standard streams are terminals.
    #[must_use]
    pub fn with_tty(mut self, tty: bool) -> Self {
        self.stdout_tty = tty;
        self.stderr_tty = tty;
        self
    }

    /// Override the platform.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Add or replace a single variable.
    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Raw value of a variable.
    #[must_use]
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Whether the variable is present at all, even with an empty value.
    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Whether the variable is present with a value other than `0`/`false`.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.var(name).is_some_and(is_truthy)
    }

    #[must_use]
    pub fn stdout_is_tty(&self) -> bool {
        self.stdout_tty
    }

    #[must_use]
    pub fn stderr_is_tty(&self) -> bool {
        self.stderr_tty
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !(value == "0" || value.eq_ignore_ascii_case("false"))
}

/// Capabilities switched off by a disable variable.
///
/// Nothing may turn these back on: not a force variable, and not a
/// programmatic override in [`LoggerConfig`](crate::config::LoggerConfig).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Disables {
    pub color: bool,
    pub unicode: bool,
    pub emoji: bool,
}

impl Disables {
    #[must_use]
    pub fn from_env(env: &Environment) -> Self {
        // NO_COLOR wins with any value, including the empty string
        let color = env.is_set("NO_COLOR") || env.flag("LOGLINE_NO_COLOR");
        Self {
            color,
            unicode: env.is_set("NO_UNICODE") || env.flag("LOGLINE_NO_UNICODE"),
            emoji: color || env.is_set("NO_EMOJI") || env.flag("LOGLINE_NO_EMOJI"),
        }
    }
}

/// Whether color output is allowed.
#[must_use]
pub fn supports_color(env: &Environment) -> bool {
    if Disables::from_env(env).color {
        return false;
    }
    if let Some(value) = env.var("FORCE_COLOR") {
        return is_truthy(value);
    }
    if env.flag("LOGLINE_FORCE_COLOR") {
        return true;
    }

    if env.var("TERM") == Some("dumb") {
        return false;
    }
    if is_ci(env) {
        return true;
    }
    if !env.stdout_is_tty() {
        return false;
    }
    if env.platform() == Platform::Windows {
        return true;
    }
    env.is_set("COLORTERM") || env.var("TERM").is_some_and(|t| !t.is_empty())
}

/// Whether Unicode symbols can be shown.
#[must_use]
pub fn supports_unicode(env: &Environment) -> bool {
    if Disables::from_env(env).unicode {
        return false;
    }
    if env.flag("LOGLINE_FORCE_UNICODE") {
        return true;
    }

    if env.platform() == Platform::Windows {
        return env.is_set("WT_SESSION")
            || env.is_set("ConEmuTask")
            || env.var("TERM_PROGRAM") == Some("vscode")
            || is_ci(env);
    }

    if env.var("TERM") == Some("linux") {
        return false;
    }

    let locale = ["LC_ALL", "LC_CTYPE", "LANG"]
        .iter()
        .filter_map(|name| env.var(name))
        .find(|value| !value.is_empty());

    match locale {
        Some(value) => {
            let value = value.to_ascii_lowercase();
            value.contains("utf-8") || value.contains("utf8")
        }
        None => true,
    }
}

/// Whether emoji can be shown.
///
/// Disabling color also disables emoji: `NO_COLOR` is honored here as a
/// global emoji disable, ahead of any library-level emoji flag.
#[must_use]
pub fn supports_emoji(env: &Environment) -> bool {
    if Disables::from_env(env).emoji {
        return false;
    }
    if env.flag("LOGLINE_FORCE_EMOJI") {
        return true;
    }

    if env
        .var("TERM_PROGRAM")
        .is_some_and(|program| EMOJI_TERMINALS.contains(&program))
    {
        return true;
    }
    if env.is_set("WT_SESSION") {
        return true;
    }
    if env.platform() == Platform::MacOs {
        return true;
    }
    if is_ci(env) {
        return true;
    }
    env.stdout_is_tty()
}

/// Whether the environment looks like a CI runner.
///
/// `LOGLINE_DISABLE_CI` forces `false` so interactive repainting can be
/// tested deterministically on CI machines.
#[must_use]
pub fn is_ci(env: &Environment) -> bool {
    if env.flag("LOGLINE_DISABLE_CI") {
        return false;
    }
    CI_ENV_VARS.iter().any(|name| env.flag(name))
}

/// Whether theme icons are shown at all.
#[must_use]
pub fn icons_enabled(env: &Environment) -> bool {
    !env.flag("LOGLINE_NO_ICONS")
}

/// Resolved answers for one environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub color: bool,
    pub unicode: bool,
    pub emoji: bool,
    pub ci: bool,
    pub icons: bool,
}

impl Capabilities {
    /// Resolve every capability against `env`.
    #[must_use]
    pub fn from_env(env: &Environment) -> Self {
        Self {
            color: supports_color(env),
            unicode: supports_unicode(env),
            emoji: supports_emoji(env),
            ci: is_ci(env),
            icons: icons_enabled(env),
        }
    }

    /// Capabilities of the current process, cached until
    /// [`reset_capabilities_cache`] is called.
    #[must_use]
    pub fn detect() -> Self {
        if let Some(caps) = *CAPABILITIES.read().unwrap_or_else(PoisonError::into_inner) {
            return caps;
        }

        let caps = Self::from_env(&Environment::current());
        *CAPABILITIES.write().unwrap_or_else(PoisonError::into_inner) = Some(caps);
        caps
    }

    /// No color, no emoji, ASCII symbols, not CI.
    #[must_use]
    pub fn plain() -> Self {
        Self {
            color: false,
            unicode: false,
            emoji: false,
            ci: false,
            icons: true,
        }
    }
}

static CAPABILITIES: RwLock<Option<Capabilities>> = RwLock::new(None);

/// Drop the cached result of [`Capabilities::detect`].
pub fn reset_capabilities_cache() {
    *CAPABILITIES.write().unwrap_or_else(PoisonError::into_inner) = None;
}
