//! Convert and render steps - normalize the input into the media kind
//! the rest of the pipeline works on.
//!
//! `ConvertStep` (audio pipeline) extracts the audio track from video
//! inputs; audio inputs pass through untouched. `RenderStep` (video
//! pipeline) is its mirror: audio inputs are rendered onto a still
//! canvas, video inputs pass through.

use crate::models::{MediaArtifact, MediaKind, Stage};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, SourceState, StepOutcome};

/// Convert step: make sure the working media is audio.
pub struct ConvertStep;

impl ConvertStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConvertStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ConvertStep {
    fn name(&self) -> &str {
        "Convert"
    }

    fn description(&self) -> &str {
        "Extract the audio track from video inputs"
    }

    fn validate_input(&self, _ctx: &Context, state: &SourceState) -> StepResult<()> {
        if !state.input.path.exists() {
            return Err(StepError::file_not_found(state.input.path.display().to_string()));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut SourceState) -> StepResult<StepOutcome> {
        let logical = state.logical_name.clone();

        match state.input.kind {
            MediaKind::Audio => {
                state.working_media = Some(state.input.clone());
                return Ok(StepOutcome::Skipped("input is already audio".to_string()));
            }
            MediaKind::Video => {}
            other => {
                return Err(StepError::invalid_input(format!(
                    "{logical}: cannot convert {other} input to audio"
                )))
            }
        }

        let file_name = format!("{logical}.wav");
        if !ctx.overwrite() && ctx.store.has_output(Stage::RawAudio, &logical) {
            let path = ctx.store.stage_dir(Stage::RawAudio).join(&file_name);
            state.working_media = Some(MediaArtifact::new(
                path,
                &logical,
                MediaKind::Audio,
                Stage::RawAudio,
            ));
            return Ok(StepOutcome::Skipped(
                "audio track already extracted".to_string(),
            ));
        }

        let work = ctx
            .source_work_dir(&logical)
            .map_err(|e| StepError::io_error("create work dir", e))?;
        let scratch = work.join(&file_name);

        ctx.logger
            .info(&format!("[{logical}] Extracting audio track..."));
        ctx.engine
            .extract_audio(&state.input.path, &scratch)
            .map_err(StepError::from)?;

        let committed = ctx
            .store
            .adopt_file(Stage::RawAudio, &scratch, &file_name)
            .map_err(|e| StepError::io_error("commit extracted audio", e))?;

        state.working_media = Some(MediaArtifact::new(
            committed,
            &logical,
            MediaKind::Audio,
            Stage::RawAudio,
        ));
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &SourceState) -> StepResult<()> {
        match &state.working_media {
            Some(media) if media.path.exists() => Ok(()),
            Some(media) => Err(StepError::file_not_found(media.path.display().to_string())),
            None => Err(StepError::invalid_output("no working media recorded")),
        }
    }
}

/// Render step: make sure the working media is video.
pub struct RenderStep;

impl RenderStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RenderStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for RenderStep {
    fn name(&self) -> &str {
        "Render"
    }

    fn description(&self) -> &str {
        "Render audio inputs onto a video canvas"
    }

    fn validate_input(&self, _ctx: &Context, state: &SourceState) -> StepResult<()> {
        if !state.input.path.exists() {
            return Err(StepError::file_not_found(state.input.path.display().to_string()));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut SourceState) -> StepResult<StepOutcome> {
        let logical = state.logical_name.clone();

        match state.input.kind {
            MediaKind::Video => {
                state.working_media = Some(state.input.clone());
                return Ok(StepOutcome::Skipped("input is already video".to_string()));
            }
            MediaKind::Audio => {}
            other => {
                return Err(StepError::invalid_input(format!(
                    "{logical}: cannot render {other} input to video"
                )))
            }
        }

        let file_name = format!("{logical}.mp4");
        if !ctx.overwrite() && ctx.store.has_output(Stage::RawVideo, &logical) {
            let path = ctx.store.stage_dir(Stage::RawVideo).join(&file_name);
            state.working_media = Some(MediaArtifact::new(
                path,
                &logical,
                MediaKind::Video,
                Stage::RawVideo,
            ));
            return Ok(StepOutcome::Skipped("video already rendered".to_string()));
        }

        let work = ctx
            .source_work_dir(&logical)
            .map_err(|e| StepError::io_error("create work dir", e))?;
        let scratch = work.join(&file_name);

        ctx.logger
            .info(&format!("[{logical}] Rendering audio onto video canvas..."));
        ctx.engine
            .render_video(&state.input.path, &scratch)
            .map_err(StepError::from)?;

        let committed = ctx
            .store
            .adopt_file(Stage::RawVideo, &scratch, &file_name)
            .map_err(|e| StepError::io_error("commit rendered video", e))?;

        state.working_media = Some(MediaArtifact::new(
            committed,
            &logical,
            MediaKind::Video,
            Stage::RawVideo,
        ));
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &SourceState) -> StepResult<()> {
        match &state.working_media {
            Some(media) if media.path.exists() => Ok(()),
            Some(media) => Err(StepError::file_not_found(media.path.display().to_string())),
            None => Err(StepError::invalid_output("no working media recorded")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::testkit::{audio_input, test_context, video_input};

    #[test]
    fn audio_input_passes_through_convert() {
        let (ctx, fixture) = test_context();
        let input = audio_input(&fixture, "talk");
        let mut state = SourceState::new(input.clone());

        let step = ConvertStep::new();
        step.validate_input(&ctx, &state).unwrap();
        let outcome = step.execute(&ctx, &mut state).unwrap();

        assert!(matches!(outcome, StepOutcome::Skipped(_)));
        assert_eq!(state.working_media.as_ref().unwrap().path, input.path);
        assert_eq!(fixture.engine.extract_calls(), 0);
    }

    #[test]
    fn video_input_is_converted_and_committed() {
        let (ctx, fixture) = test_context();
        let input = video_input(&fixture, "meeting");
        let mut state = SourceState::new(input);

        let step = ConvertStep::new();
        let outcome = step.execute(&ctx, &mut state).unwrap();

        assert_eq!(outcome, StepOutcome::Success);
        assert_eq!(fixture.engine.extract_calls(), 1);
        assert!(ctx.store.has_output(Stage::RawAudio, "meeting"));

        let media = state.working_media.as_ref().unwrap();
        assert_eq!(media.kind, MediaKind::Audio);
        assert!(media.path.exists());
        step.validate_output(&ctx, &state).unwrap();
    }

    #[test]
    fn committed_audio_skips_reconversion() {
        let (ctx, fixture) = test_context();
        let input = video_input(&fixture, "meeting");

        let step = ConvertStep::new();
        let mut first = SourceState::new(input.clone());
        step.execute(&ctx, &mut first).unwrap();

        let mut second = SourceState::new(input);
        let outcome = step.execute(&ctx, &mut second).unwrap();

        assert!(matches!(outcome, StepOutcome::Skipped(_)));
        assert_eq!(fixture.engine.extract_calls(), 1);
        assert!(second.working_media.is_some());
    }

    #[test]
    fn render_mirrors_convert_for_audio() {
        let (ctx, fixture) = test_context();
        let input = audio_input(&fixture, "talk");
        let mut state = SourceState::new(input);

        let step = RenderStep::new();
        let outcome = step.execute(&ctx, &mut state).unwrap();

        assert_eq!(outcome, StepOutcome::Success);
        assert_eq!(fixture.engine.render_calls(), 1);
        assert!(ctx.store.has_output(Stage::RawVideo, "talk"));
        assert_eq!(state.working_media.as_ref().unwrap().kind, MediaKind::Video);
    }

    #[test]
    fn missing_input_fails_validation() {
        let (ctx, fixture) = test_context();
        let input = audio_input(&fixture, "gone");
        std::fs::remove_file(&input.path).unwrap();

        let state = SourceState::new(input);
        let err = ConvertStep::new().validate_input(&ctx, &state).unwrap_err();
        assert_eq!(err.kind(), "file-not-found");
    }
}
