//! Error types for the pipeline orchestrator.
//!
//! Two levels: [`RunError`] aborts the whole run, [`StepError`] fails a
//! single logical name and is reported in the end-of-run summary. Each
//! `StepError` maps to a stable kind string for summary grouping.

use std::io;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::engine::EngineError;
use crate::scraper::ScrapeError;

/// Fatal, run-level errors. Anything else is contained to one source.
#[derive(Error, Debug)]
pub enum RunError {
    /// The store root cannot be used at all.
    #[error("Stage store unusable: {0}")]
    StageIo(String),

    /// A link catalog could not be parsed.
    #[error("Malformed link catalog: {0}")]
    MalformedCatalog(#[from] CatalogError),

    /// Settings cannot be turned into a working toolchain.
    #[error("Configuration unusable: {0}")]
    Config(String),

    /// Nothing to do: no raw media, pages or catalogs anywhere.
    #[error("No usable inputs: {0}")]
    NoInput(String),

    /// The run was cancelled.
    #[error("Run was cancelled")]
    Cancelled,
}

impl RunError {
    pub fn stage_io(message: impl Into<String>) -> Self {
        Self::StageIo(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn no_input(message: impl Into<String>) -> Self {
        Self::NoInput(message.into())
    }
}

/// Result type for run-level operations.
pub type RunResult<T> = Result<T, RunError>;

/// Error from a pipeline step, scoped to one logical name.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// Nobody logged in before the deadline.
    #[error("Login not completed: {0}")]
    LoginTimeout(String),

    /// Transcript content could not be obtained.
    #[error("Extraction failed: {0}")]
    ExtractionFailure(String),

    /// Media conversion, rendering or splitting failed.
    #[error("Conversion failed: {0}")]
    ConversionFailure(String),

    /// Fragments are missing under the strict assembly policy.
    #[error("Transcript incomplete: {0}")]
    IncompleteFragments(String),

    /// An external command failed.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// A required file was not found.
    #[error("Required file not found: {path}")]
    FileNotFound { path: String },

    /// Parsing error (JSON, tool output).
    #[error("Failed to parse {what}: {message}")]
    Parse { what: String, message: String },
}

impl StepError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an invalid output error.
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    /// Create a login timeout error.
    pub fn login_timeout(message: impl Into<String>) -> Self {
        Self::LoginTimeout(message.into())
    }

    /// Create an extraction failure.
    pub fn extraction_failure(message: impl Into<String>) -> Self {
        Self::ExtractionFailure(message.into())
    }

    /// Create a conversion failure.
    pub fn conversion_failure(message: impl Into<String>) -> Self {
        Self::ConversionFailure(message.into())
    }

    /// Create an incomplete fragments error.
    pub fn incomplete_fragments(message: impl Into<String>) -> Self {
        Self::IncompleteFragments(message.into())
    }

    /// Create an I/O error with context.
    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a parse error.
    pub fn parse(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Stable kind string used to group failures in the run summary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid-input",
            Self::InvalidOutput(_) => "invalid-output",
            Self::LoginTimeout(_) => "login-timeout",
            Self::ExtractionFailure(_) => "extraction-failure",
            Self::ConversionFailure(_) => "conversion-failure",
            Self::IncompleteFragments(_) => "incomplete-fragments",
            Self::CommandFailed { .. } => "command-failed",
            Self::Io { .. } => "io",
            Self::FileNotFound { .. } => "file-not-found",
            Self::Parse { .. } => "parse",
        }
    }
}

impl From<ScrapeError> for StepError {
    fn from(e: ScrapeError) -> Self {
        match e {
            ScrapeError::LoginTimeout(secs) => {
                Self::login_timeout(format!("no sign-in within {secs}s"))
            }
            other => Self::extraction_failure(other.to_string()),
        }
    }
}

/// Engine errors keep their structure where the summary and the log
/// care about it; the rest collapses into a conversion failure.
impl From<EngineError> for StepError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::CommandFailed {
                tool,
                code,
                message,
            } => Self::CommandFailed {
                tool,
                exit_code: code,
                message,
            },
            EngineError::FileNotFound(path) => Self::FileNotFound {
                path: path.display().to_string(),
            },
            EngineError::ParseError { tool, message } => Self::Parse {
                what: format!("{tool} output"),
                message,
            },
            other => Self::ConversionFailure(other.to_string()),
        }
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// A step failure with its source context, as recorded per logical name.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed for this source.
    #[error("'{source_name}' failed at step '{step_name}': {source}")]
    StepFailed {
        source_name: String,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// The run was cancelled before this source finished.
    #[error("'{source_name}' was cancelled")]
    Cancelled { source_name: String },
}

impl PipelineError {
    pub fn step_failed(
        source_name: impl Into<String>,
        step_name: impl Into<String>,
        source: StepError,
    ) -> Self {
        Self::StepFailed {
            source_name: source_name.into(),
            step_name: step_name.into(),
            source,
        }
    }

    pub fn cancelled(source_name: impl Into<String>) -> Self {
        Self::Cancelled {
            source_name: source_name.into(),
        }
    }

    /// Kind string for the summary; the inner step kind when present.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StepFailed { source, .. } => source.kind(),
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Name of the failing step.
    pub fn step_name(&self) -> &str {
        match self {
            Self::StepFailed { step_name, .. } => step_name,
            Self::Cancelled { .. } => "-",
        }
    }
}

/// Result type for per-source pipeline runs.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_kinds_are_stable() {
        assert_eq!(StepError::login_timeout("x").kind(), "login-timeout");
        assert_eq!(StepError::conversion_failure("x").kind(), "conversion-failure");
        assert_eq!(StepError::incomplete_fragments("x").kind(), "incomplete-fragments");
        assert_eq!(
            StepError::io_error("read", io::Error::new(io::ErrorKind::Other, "x")).kind(),
            "io"
        );
    }

    #[test]
    fn scrape_errors_map_to_step_kinds() {
        let timeout: StepError = ScrapeError::LoginTimeout(600).into();
        assert_eq!(timeout.kind(), "login-timeout");

        let other: StepError = ScrapeError::NoRows.into();
        assert_eq!(other.kind(), "extraction-failure");
    }

    #[test]
    fn engine_command_failures_stay_structured() {
        let failed: StepError = EngineError::CommandFailed {
            tool: "ffmpeg".to_string(),
            code: 1,
            message: "filter parse error".to_string(),
        }
        .into();
        assert_eq!(failed.kind(), "command-failed");
        assert!(failed.to_string().contains("exit code 1"));

        let missing: StepError = EngineError::FileNotFound("/tmp/in.wav".into()).into();
        assert_eq!(missing.kind(), "file-not-found");

        let spawn: StepError = EngineError::SpawnFailed {
            tool: "ffmpeg".to_string(),
            message: "not on PATH".to_string(),
        }
        .into();
        assert_eq!(spawn.kind(), "conversion-failure");
    }

    #[test]
    fn pipeline_error_carries_step_context() {
        let err = PipelineError::step_failed(
            "meeting",
            "Split",
            StepError::conversion_failure("segmenting failed"),
        );
        assert_eq!(err.kind(), "conversion-failure");
        assert_eq!(err.step_name(), "Split");
        assert!(err.to_string().contains("'meeting'"));
    }
}
