//! Transcribe step - run committed segments through the transcription
//! backend, committing one HTML page per segment.
//!
//! Per-segment failures are tolerated as long as at least one page is
//! produced; the assembly policy decides later whether the gaps are
//! acceptable.

use crate::engine::EngineError;
use crate::models::Stage;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, SourceState, StepOutcome};

/// Transcribe step for turning media segments into raw transcript pages.
pub struct TranscribeStep;

impl TranscribeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TranscribeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for TranscribeStep {
    fn name(&self) -> &str {
        "Transcribe"
    }

    fn description(&self) -> &str {
        "Transcribe segments with the configured backend"
    }

    fn validate_input(&self, _ctx: &Context, state: &SourceState) -> StepResult<()> {
        state.require_metadata().map_err(StepError::invalid_input)?;
        if state.segment_stage.is_none() {
            return Err(StepError::invalid_input("no committed segments"));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut SourceState) -> StepResult<StepOutcome> {
        let logical = state.logical_name.clone();
        let meta = state
            .require_metadata()
            .map_err(StepError::invalid_input)?
            .clone();
        let Some(stage) = state.segment_stage else {
            return Err(StepError::invalid_input("no committed segments"));
        };

        let segments = ctx
            .store
            .list_segments(stage, &logical)
            .map_err(|e| StepError::io_error("list segments", e))?;
        if segments.is_empty() {
            return Err(StepError::invalid_input(format!(
                "{logical}: no segment files on disk"
            )));
        }
        if segments.len() != meta.segment_count {
            ctx.logger.warn(&format!(
                "[{logical}] Sidecar declares {} segment(s) but {} are on disk",
                meta.segment_count,
                segments.len()
            ));
        }

        let pending: Vec<_> = segments
            .iter()
            .filter(|s| ctx.overwrite() || !ctx.store.has_output(Stage::Html, &s.logical_name))
            .collect();
        if pending.is_empty() {
            return Ok(StepOutcome::Skipped(
                "segment pages already present".to_string(),
            ));
        }

        let Some(backend) = ctx.transcriber.as_ref() else {
            return Err(StepError::invalid_input(
                "no transcriber command configured; set transcriber_command in [engine]",
            ));
        };
        let work = ctx
            .source_work_dir(&logical)
            .map_err(|e| StepError::io_error("create work dir", e))?;

        let total = pending.len();
        let mut produced = 0usize;
        let mut failed: Vec<String> = Vec::new();

        for (i, segment) in pending.iter().enumerate() {
            let page_name = format!("{}.html", segment.logical_name);
            let scratch = work.join(&page_name);

            ctx.logger.info(&format!(
                "[{logical}] Transcribing {} ({}/{})",
                segment.file_name(),
                i + 1,
                total
            ));

            match backend.transcribe(&segment.path, &scratch) {
                Ok(()) => {
                    ctx.store
                        .adopt_file(Stage::Html, &scratch, &page_name)
                        .map_err(|e| StepError::io_error("commit segment page", e))?;
                    produced += 1;
                }
                Err(EngineError::CommandFailed { tool, code, message }) => {
                    ctx.logger.tool_failure(
                        &format!(
                            "[{logical}] {tool} exited with code {code} on {}",
                            segment.file_name()
                        ),
                        &message,
                    );
                    failed.push(format!(
                        "{}: {tool} exited with code {code}",
                        segment.logical_name
                    ));
                }
                Err(e) => {
                    ctx.logger
                        .warn(&format!("[{logical}] {} failed: {e}", segment.file_name()));
                    failed.push(format!("{}: {e}", segment.logical_name));
                }
            }
        }

        if produced == 0 {
            let first = failed.first().map(String::as_str).unwrap_or("unknown");
            return Err(StepError::extraction_failure(format!(
                "all {total} segment(s) failed transcription; first: {first}"
            )));
        }
        if !failed.is_empty() {
            ctx.logger.warn(&format!(
                "[{logical}] {} of {total} segment(s) failed transcription",
                failed.len()
            ));
        }
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &SourceState) -> StepResult<()> {
        let meta = state.require_metadata().map_err(StepError::invalid_output)?;
        let logical = &state.logical_name;
        let any = meta
            .segments
            .iter()
            .any(|idx| ctx.store.has_output(Stage::Html, &format!("{logical}_part{idx:03}")));
        if any {
            Ok(())
        } else {
            Err(StepError::invalid_output("no segment pages produced"))
        }
    }
}
