//! Pipeline orchestrator for turning staged media into transcripts.
//!
//! This module provides the infrastructure for running multi-step
//! processing pipelines over a stage store. Each source moves through a
//! sequence of steps that validate, execute, and record their results;
//! a run processor routes the store to one of four pipelines and fans
//! sources out over a worker pool.
//!
//! # Architecture
//!
//! ```text
//! RunProcessor
//!     ├── Scrape phase (SharePoint only, one browser, serial)
//!     └── Pipeline per source (parallel, claim per logical name)
//!             Audio-Based: Convert → Split → Enhance → Transcribe → Extract → Assemble
//!             Video-Based: Render → Split → Transcribe → Extract → Assemble
//!             HTML-Only:   HtmlTranscript
//!             SharePoint:  JsonTranscript
//! ```
//!
//! # Example
//!
//! ```ignore
//! use scribe_core::orchestrator::RunProcessor;
//! use scribe_core::models::RunMode;
//!
//! let mut processor = RunProcessor::new(settings);
//! let summary = processor.run(RunMode::Auto)?;
//! println!("{} source(s) done", summary.completed_count());
//! ```

mod errors;
mod pipeline;
mod router;
mod run;
mod step;
pub mod steps;
#[cfg(test)]
mod testkit;
mod types;

pub use errors::{PipelineError, PipelineResult, RunError, RunResult, StepError, StepResult};
pub use pipeline::{CancelHandle, Pipeline, PipelineRunResult};
pub use router::{select_pipeline, StageSnapshot};
pub use run::{RunProcessor, RunSummary, SourceOutcome, SourceReport};
pub use step::PipelineStep;
pub use steps::{
    AssembleStep, ConvertStep, EnhanceStep, ExtractStep, HtmlTranscriptStep, JsonTranscriptStep,
    RenderStep, SplitStep, TranscribeStep,
};
pub use types::{Context, SourceState, StepOutcome};

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::models::PipelineKind;

/// Create the step sequence for one pipeline kind, sharing a
/// cancellation flag with the caller.
///
/// The audio pipeline executes these steps:
/// 1. Convert - extract a mono speech-rate audio track
/// 2. Split - cut the track into fixed-length segments
/// 3. Enhance - run the speech filter chain (best effort)
/// 4. Transcribe - produce one page per segment
/// 5. Extract - distill readable text from each page
/// 6. Assemble - stitch fragments into the final transcript
///
/// The video pipeline renders instead of converting and keeps the
/// segments as video; the two direct pipelines are single-step.
pub fn create_pipeline(kind: PipelineKind, cancelled: Arc<AtomicBool>) -> Pipeline {
    let pipeline = Pipeline::with_cancel_flag(cancelled);
    match kind {
        PipelineKind::AudioBased => pipeline
            .with_step(ConvertStep::new())
            .with_step(SplitStep::new())
            .with_step(EnhanceStep::new())
            .with_step(TranscribeStep::new())
            .with_step(ExtractStep::new())
            .with_step(AssembleStep::new()),
        PipelineKind::VideoBased => pipeline
            .with_step(RenderStep::new())
            .with_step(SplitStep::new())
            .with_step(TranscribeStep::new())
            .with_step(ExtractStep::new())
            .with_step(AssembleStep::new()),
        PipelineKind::HtmlOnly => pipeline.with_step(HtmlTranscriptStep::new()),
        PipelineKind::SharePoint => pipeline.with_step(JsonTranscriptStep::new()),
    }
}
