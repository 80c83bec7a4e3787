//! Logging for the transcript pipeline.
//!
//! Two layers coexist. `tracing` carries process-wide diagnostics and
//! honors `RUST_LOG`. [`RunLogger`] is narrower: one instance per run,
//! writing the run's log file and echoing the same lines to an optional
//! console sink. Failed external tools get a bounded excerpt of their
//! output through [`RunLogger::tool_failure`].
//!
//! # Example
//!
//! ```no_run
//! use scribe_core::logging::{LogConfig, RunLogger};
//!
//! let logger = RunLogger::new(
//!     "run_20260101_120000",
//!     "recordings/.logs",
//!     LogConfig::default(),
//!     None,
//! ).unwrap();
//!
//! logger.phase("Split");
//! logger.command("ffmpeg -i clip.wav ...");
//! logger.progress(50);
//! logger.success("Split complete");
//! ```

mod run_logger;
mod types;

pub use run_logger::{generate_run_id, RunLogger};
pub use types::{LogConfig, LogLevel, LogSink, MessagePrefix};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies. Output
/// goes to stderr. Call once at startup.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_str(default_level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

fn level_to_filter_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_to_filter_works() {
        assert_eq!(level_to_filter_str(LogLevel::Debug), "debug");
        assert_eq!(level_to_filter_str(LogLevel::Info), "info");
    }
}
