//! Log levels, prefixes and the run-log configuration.

use serde::{Deserialize, Serialize};

/// Minimum severity a message needs to reach the run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// Behavior knobs for one run's log output.
///
/// Built from the `[logging]` config section; `compact` keeps long runs
/// readable by thinning progress lines down to `progress_step` jumps.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub compact: bool,
    /// Progress is only logged when it crosses a multiple of this percentage.
    pub progress_step: u32,
    /// How many trailing lines of a failed tool's output are logged.
    pub error_tail: usize,
    pub show_timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            compact: true,
            progress_step: 20,
            error_tail: 20,
            show_timestamps: true,
        }
    }
}

/// Callback receiving each formatted log line, used by the CLI to echo the
/// run log to the console.
pub type LogSink = Box<dyn Fn(&str) + Send + Sync>;

/// Marker put in front of a log line to make run logs scannable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePrefix {
    /// An external command line being run.
    Command,
    /// One pipeline step starting.
    Phase,
    /// One logical name inside a step.
    Section,
    Success,
    Warning,
    Error,
}

impl MessagePrefix {
    pub fn format(&self, message: &str) -> String {
        match self {
            MessagePrefix::Command => format!("$ {message}"),
            MessagePrefix::Phase => format!("=== {message} ==="),
            MessagePrefix::Section => format!("--- {message} ---"),
            MessagePrefix::Success => format!("[SUCCESS] {message}"),
            MessagePrefix::Warning => format!("[WARNING] {message}"),
            MessagePrefix::Error => format!("[ERROR] {message}"),
        }
    }
}
