#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub mod config;
pub mod console;
pub mod detection;
pub mod emoji;
pub mod error; // Error taxonomy and render boundary
pub mod format; // Message formatter and clocks
pub mod logger;
pub mod logging; // Internal targets, `log` and `tracing` bridges
pub mod prefix; // Shared prefix alignment
pub mod renderer; // Task-list rendering
pub mod spinner;
pub mod task;
pub mod testing; // Test utilities
pub mod theme;
pub mod value;

pub use config::{LoggerConfig, TimestampFormat};
pub use console::{LoglineConsole, Stream, console, init_console};
pub use detection::{Capabilities, Disables, Environment};
pub use emoji::strip_emojis;
pub use error::{LoglineError, RenderBoundary};
pub use format::{Clock, MessageFormatter, SystemClock};
pub use logger::{DEFAULT_SPINNER_KEY, Logger, LoggerBuilder};
pub use logging::targets;
pub use prefix::{PrefixRegistry, global_registry};
pub use renderer::{RenderOptions, RenderSession, TaskNode, TaskRenderer, TaskState};
pub use spinner::{Spinner, SpinnerFacade};
pub use task::{Gate, RunOutcome, Task, TaskRun, Verdict};
pub use theme::{Level, ThemeOverrides, get_theme, get_theme_by_name};
pub use value::{ErrorValue, LogValue, ObjectRef, safe_json_stringify};
