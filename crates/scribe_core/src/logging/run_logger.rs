//! Per-run logger writing one file per pipeline run.
//!
//! The processor and every worker share one of these through the run
//! context. Lines go to the run's log file and, when a sink is
//! installed, to the console as well, so both always show the same
//! text.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;

use super::types::{LogConfig, LogLevel, LogSink, MessagePrefix};

/// Logger for one pipeline run.
pub struct RunLogger {
    run_id: String,
    log_path: PathBuf,
    file: Mutex<Option<BufWriter<File>>>,
    sink: Mutex<Option<LogSink>>,
    config: LogConfig,
    last_progress: Mutex<u32>,
}

impl RunLogger {
    /// Open the run's log file under `log_dir`, creating the directory
    /// when needed. The file is named after the run id.
    pub fn new(
        run_id: impl Into<String>,
        log_dir: impl AsRef<Path>,
        config: LogConfig,
        sink: Option<LogSink>,
    ) -> std::io::Result<Self> {
        let run_id = run_id.into();
        let log_dir = log_dir.as_ref();
        fs::create_dir_all(log_dir)?;

        let log_path = log_dir.join(format!("{}.log", sanitize_filename(&run_id)));
        let file = BufWriter::new(File::create(&log_path)?);

        Ok(Self {
            run_id,
            log_path,
            file: Mutex::new(Some(file)),
            sink: Mutex::new(sink),
            config,
            last_progress: Mutex::new(0),
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Write one line, dropped when below the configured level.
    pub fn log(&self, level: LogLevel, message: &str) {
        if level < self.config.level {
            return;
        }
        self.emit(message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, &MessagePrefix::Warning.format(message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &MessagePrefix::Error.format(message));
    }

    /// Log an external command line about to run.
    pub fn command(&self, command_line: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Command.format(command_line));
    }

    /// Mark the start of a run phase.
    pub fn phase(&self, name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Phase.format(name));
    }

    /// Mark one logical name inside a phase.
    pub fn section(&self, name: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Section.format(name));
    }

    pub fn success(&self, message: &str) {
        self.log(LogLevel::Info, &MessagePrefix::Success.format(message));
    }

    /// Log a progress percentage.
    ///
    /// Compact mode thins these: a value only gets through when it
    /// crosses into a new `progress_step` bucket or hits 100. Returns
    /// whether the line was written.
    pub fn progress(&self, percent: u32) -> bool {
        if self.config.compact {
            let mut last = self.last_progress.lock();
            let step = self.config.progress_step.max(1);
            if percent / step <= *last / step && percent < 100 {
                return false;
            }
            *last = percent;
        }
        self.log(LogLevel::Info, &format!("Progress: {percent}%"));
        true
    }

    /// Log the tail of a failed tool's output.
    ///
    /// Captured stderr can run to hundreds of lines; only the last
    /// `error_tail` of them make it into the log, under an error header
    /// naming the source.
    pub fn tool_failure(&self, context: &str, output: &str) {
        let lines: Vec<&str> = output.lines().collect();
        let shown = lines.len().min(self.config.error_tail);
        let start = lines.len() - shown;

        self.error(&format!("{context} (last {shown} output line(s))"));
        for line in &lines[start..] {
            self.log(LogLevel::Error, &format!("  {line}"));
        }
    }

    pub fn flush(&self) {
        if let Some(writer) = self.file.lock().as_mut() {
            let _ = writer.flush();
        }
    }

    /// Flush and drop the file handle; later lines only reach the sink.
    pub fn close(&self) {
        self.flush();
        *self.file.lock() = None;
    }

    fn emit(&self, message: &str) {
        let line = if self.config.show_timestamps {
            format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
        } else {
            message.to_string()
        };

        if let Some(writer) = self.file.lock().as_mut() {
            let _ = writeln!(writer, "{line}");
        }
        if let Some(sink) = self.sink.lock().as_ref() {
            sink(&line);
        }
    }
}

impl Drop for RunLogger {
    fn drop(&mut self) {
        self.close();
    }
}

/// Strip characters that cannot appear in a file name.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

/// Fresh run identifier from the wall clock.
pub fn generate_run_id() -> String {
    format!("run_{}", Local::now().format("%Y%m%d_%H%M%S"))
}
