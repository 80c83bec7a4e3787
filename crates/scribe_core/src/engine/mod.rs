//! External tool adapters.
//!
//! Everything that leaves the process goes through here: ffmpeg for
//! media work, a configurable command for transcription, and the
//! readability pass for HTML. Pipeline steps depend only on the
//! [`MediaEngine`] and [`TranscriptionBackend`] traits.

mod ffmpeg;
mod html;
mod transcriber;
mod types;

pub use ffmpeg::{FfmpegEngine, TRANSCRIPTION_SAMPLE_RATE};
pub use html::{extract_html_text, ExtractedDocument};
pub use transcriber::CommandTranscriber;
pub use types::{EngineError, EngineResult, MediaEngine, TranscriptionBackend};
