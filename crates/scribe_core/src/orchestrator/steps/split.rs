//! Split step - cut the working media into bounded chunks and commit
//! them together with a segment sidecar.
//!
//! The sidecar is the commit record: segments count as present only
//! once it exists. A crash mid-split leaves an uncommitted stage that
//! the next run clears and redoes from scratch.

use crate::models::{MediaKind, SegmentMetadata, Stage};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, SourceState, StepOutcome};

/// Split step for cutting media into transcription-sized segments.
pub struct SplitStep;

impl SplitStep {
    pub fn new() -> Self {
        Self
    }

    fn target_stage(kind: MediaKind) -> Option<Stage> {
        match kind {
            MediaKind::Audio => Some(Stage::SplittedAudio),
            MediaKind::Video => Some(Stage::SplittedVideo),
            _ => None,
        }
    }
}

impl Default for SplitStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for SplitStep {
    fn name(&self) -> &str {
        "Split"
    }

    fn description(&self) -> &str {
        "Split media into bounded segments"
    }

    fn validate_input(&self, _ctx: &Context, state: &SourceState) -> StepResult<()> {
        match &state.working_media {
            Some(media) if media.path.exists() => Ok(()),
            Some(media) => Err(StepError::file_not_found(media.path.display().to_string())),
            None => Err(StepError::invalid_input("no working media to split")),
        }
    }

    fn execute(&self, ctx: &Context, state: &mut SourceState) -> StepResult<StepOutcome> {
        let logical = state.logical_name.clone();
        let Some(media) = state.working_media.clone() else {
            return Err(StepError::invalid_input("no working media to split"));
        };
        let Some(target) = Self::target_stage(media.kind) else {
            return Err(StepError::invalid_input(format!(
                "{logical}: cannot split {} media",
                media.kind
            )));
        };

        if !ctx.overwrite() && ctx.store.has_sidecar(target, &logical) {
            match SegmentMetadata::load_from(&ctx.store.stage_dir(target), &logical) {
                Ok(Some(meta)) if meta.validate().is_ok() => {
                    state.metadata = Some(meta);
                    state.segment_stage = Some(target);
                    return Ok(StepOutcome::Skipped(
                        "segments already committed".to_string(),
                    ));
                }
                Ok(_) => ctx
                    .logger
                    .warn(&format!("[{logical}] Segment sidecar invalid, re-splitting")),
                Err(e) => ctx.logger.warn(&format!(
                    "[{logical}] Segment sidecar unreadable ({e}), re-splitting"
                )),
            }
        }

        // Partial output from an interrupted run is cleared first.
        ctx.store
            .clear_segments(target, &logical)
            .map_err(|e| StepError::io_error("clear stale segments", e))?;

        let work = ctx
            .source_work_dir(&logical)
            .map_err(|e| StepError::io_error("create work dir", e))?;
        let chunk_secs = u64::from(ctx.settings.pipeline.split_minutes) * 60;

        ctx.logger.info(&format!(
            "[{logical}] Splitting into {} minute chunks...",
            ctx.settings.pipeline.split_minutes
        ));
        let produced = ctx
            .engine
            .split(&media.path, &work, &logical, chunk_secs)
            .map_err(StepError::from)?;

        for path in &produced {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                return Err(StepError::conversion_failure(format!(
                    "segment path has no usable file name: {}",
                    path.display()
                )));
            };
            ctx.store
                .adopt_file(target, path, file_name)
                .map_err(|e| StepError::io_error("commit segment", e))?;
        }

        let meta = SegmentMetadata::new(&logical, &ctx.settings.pipeline.language, produced.len());
        meta.validate()
            .map_err(|e| StepError::invalid_output(e.to_string()))?;
        meta.save_to(&ctx.store.stage_dir(target))
            .map_err(|e| StepError::io_error("write segment sidecar", e))?;
        ctx.store.record_sidecar(target, &logical);

        ctx.logger
            .info(&format!("[{logical}] Committed {} segment(s)", produced.len()));
        state.metadata = Some(meta);
        state.segment_stage = Some(target);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &SourceState) -> StepResult<()> {
        let Some(stage) = state.segment_stage else {
            return Err(StepError::invalid_output("no segment stage recorded"));
        };
        if !ctx.store.has_sidecar(stage, &state.logical_name) {
            return Err(StepError::invalid_output("segment sidecar not committed"));
        }
        Ok(())
    }
}
