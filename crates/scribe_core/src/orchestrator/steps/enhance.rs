//! Enhance step - speech-clarity filtering of committed audio segments.
//!
//! Enhancement is best effort. Any failure falls back to the unenhanced
//! split stage with a warning; it never fails the source.

use crate::models::Stage;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, SourceState, StepOutcome};

/// Enhance step for filtering audio segments before transcription.
pub struct EnhanceStep;

impl EnhanceStep {
    pub fn new() -> Self {
        Self
    }

    /// Abandon enhancement and point the pipeline back at the split
    /// stage. Partial enhanced output is cleared so a later run does
    /// not mistake it for a committed stage.
    fn fall_back(
        &self,
        ctx: &Context,
        state: &mut SourceState,
        logical: &str,
        reason: &str,
    ) -> StepResult<StepOutcome> {
        ctx.logger.warn(&format!(
            "[{logical}] Enhancement failed ({reason}), using unenhanced segments"
        ));
        if let Err(e) = ctx.store.clear_segments(Stage::EnhancedAudio, logical) {
            ctx.logger
                .debug(&format!("[{logical}] Could not clear partial enhancement: {e}"));
        }
        state.segment_stage = Some(Stage::SplittedAudio);
        Ok(StepOutcome::Skipped(format!("enhancement failed: {reason}")))
    }
}

impl Default for EnhanceStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for EnhanceStep {
    fn name(&self) -> &str {
        "Enhance"
    }

    fn description(&self) -> &str {
        "Filter audio segments for speech clarity"
    }

    fn validate_input(&self, _ctx: &Context, state: &SourceState) -> StepResult<()> {
        state
            .require_metadata()
            .map_err(StepError::invalid_input)?;
        match state.segment_stage {
            Some(Stage::SplittedAudio) => Ok(()),
            Some(other) => Err(StepError::invalid_input(format!(
                "cannot enhance segments in {other}"
            ))),
            None => Err(StepError::invalid_input("no committed segments to enhance")),
        }
    }

    fn execute(&self, ctx: &Context, state: &mut SourceState) -> StepResult<StepOutcome> {
        let logical = state.logical_name.clone();

        if !ctx.settings.enhance.enabled {
            return Ok(StepOutcome::Skipped("enhancement disabled".to_string()));
        }

        if !ctx.overwrite() && ctx.store.has_sidecar(Stage::EnhancedAudio, &logical) {
            state.segment_stage = Some(Stage::EnhancedAudio);
            return Ok(StepOutcome::Skipped(
                "enhanced segments already committed".to_string(),
            ));
        }

        let meta = state
            .require_metadata()
            .map_err(StepError::invalid_input)?
            .clone();

        let segments = ctx
            .store
            .list_segments(Stage::SplittedAudio, &logical)
            .map_err(|e| StepError::io_error("list segments", e))?;
        if segments.is_empty() {
            return Err(StepError::invalid_input(format!(
                "{logical}: no segment files on disk"
            )));
        }

        if let Err(e) = ctx.store.clear_segments(Stage::EnhancedAudio, &logical) {
            return self.fall_back(ctx, state, &logical, &e.to_string());
        }
        let work = match ctx.source_work_dir(&logical) {
            Ok(dir) => dir,
            Err(e) => return self.fall_back(ctx, state, &logical, &e.to_string()),
        };

        ctx.logger.info(&format!(
            "[{logical}] Enhancing {} audio segment(s)...",
            segments.len()
        ));
        for segment in &segments {
            let file_name = segment.file_name().to_string();
            let scratch = work.join(&file_name);

            if let Err(e) = ctx.engine.enhance(&segment.path, &scratch, &ctx.settings.enhance) {
                return self.fall_back(ctx, state, &logical, &e.to_string());
            }
            if let Err(e) = ctx
                .store
                .adopt_file(Stage::EnhancedAudio, &scratch, &file_name)
            {
                return self.fall_back(ctx, state, &logical, &e.to_string());
            }
        }

        if let Err(e) = meta.save_to(&ctx.store.stage_dir(Stage::EnhancedAudio)) {
            return self.fall_back(ctx, state, &logical, &e.to_string());
        }
        ctx.store.record_sidecar(Stage::EnhancedAudio, &logical);

        ctx.logger
            .info(&format!("[{logical}] Enhanced {} segment(s)", segments.len()));
        state.segment_stage = Some(Stage::EnhancedAudio);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &SourceState) -> StepResult<()> {
        match state.segment_stage {
            Some(Stage::EnhancedAudio)
                if ctx.store.has_sidecar(Stage::EnhancedAudio, &state.logical_name) =>
            {
                Ok(())
            }
            _ => Err(StepError::invalid_output("enhanced segments not committed")),
        }
    }
}
