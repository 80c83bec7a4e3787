//! Error type and trait seams for media tooling.
//!
//! The pipeline talks to external tools through the [`MediaEngine`] and
//! [`TranscriptionBackend`] traits so that steps can be tested against
//! fakes without spawning processes.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::config::EnhanceSettings;

/// Error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input file does not exist.
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// The external tool could not be started at all.
    #[error("{tool} could not be started: {message}")]
    SpawnFailed { tool: String, message: String },

    /// The external tool ran and exited with a failure status.
    #[error("{tool} exited with code {code}: {message}")]
    CommandFailed {
        tool: String,
        code: i32,
        message: String,
    },

    /// Tool output could not be interpreted.
    #[error("failed to parse {tool} output: {message}")]
    ParseError { tool: String, message: String },

    /// Expected output file missing or empty after the tool ran.
    #[error("output missing or empty: {0}")]
    OutputMissing(PathBuf),

    /// Transcriber template lacks the `{input}` or `{output}` placeholder.
    #[error("transcriber template must reference {{input}} and {{output}}")]
    BadTemplate,

    /// HTML could not be reduced to readable text.
    #[error("could not read document: {0}")]
    UnreadableDocument(String),

    /// General I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Media conversion, splitting and enhancement operations.
///
/// One implementation wraps ffmpeg; tests substitute fakes that write
/// placeholder files.
pub trait MediaEngine: Send + Sync {
    /// Extract the audio track of a video file into `output` (WAV).
    fn extract_audio(&self, input: &Path, output: &Path) -> EngineResult<()>;

    /// Render an audio file into `output` as a video with a synthesized
    /// picture track (MP4).
    fn render_video(&self, input: &Path, output: &Path) -> EngineResult<()>;

    /// Split `input` into chunks of at most `chunk_seconds`, writing
    /// `{logical_name}_partNNN.{ext}` files into `out_dir`.
    ///
    /// Returns the produced segment paths ordered by segment index.
    fn split(
        &self,
        input: &Path,
        out_dir: &Path,
        logical_name: &str,
        chunk_seconds: u64,
    ) -> EngineResult<Vec<PathBuf>>;

    /// Apply the speech enhancement filter chain to an audio file.
    fn enhance(
        &self,
        input: &Path,
        output: &Path,
        settings: &EnhanceSettings,
    ) -> EngineResult<()>;

    /// Media duration in seconds.
    fn duration_secs(&self, input: &Path) -> EngineResult<f64>;
}

/// Produces an HTML transcript file from one audio or video segment.
pub trait TranscriptionBackend: Send + Sync {
    /// Transcribe `input` and write the result to `output`.
    fn transcribe(&self, input: &Path, output: &Path) -> EngineResult<()>;
}

/// Run a prepared command, capturing its output.
///
/// Fails with [`EngineError::CommandFailed`] when the process exits
/// non-zero, with the tool's stderr as the message.
pub(crate) fn run_command(mut cmd: Command, tool: &str) -> EngineResult<std::process::Output> {
    cmd.stdin(Stdio::null());

    tracing::debug!("Running {}: {:?}", tool, cmd);

    let output = cmd.output().map_err(|e| EngineError::SpawnFailed {
        tool: tool.to_string(),
        message: e.to_string(),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EngineError::CommandFailed {
            tool: tool.to_string(),
            code: output.status.code().unwrap_or(-1),
            message: stderr.trim().to_string(),
        });
    }

    Ok(output)
}
