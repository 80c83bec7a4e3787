//! Assemble step - merge extracted fragments into the final transcript
//! and commit it to the transcript stage.

use crate::assembler::{assemble, AssembleError};
use crate::models::Stage;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, SourceState, StepOutcome};

/// Assemble step for producing the ordered per-source transcript.
pub struct AssembleStep;

impl AssembleStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AssembleStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for AssembleStep {
    fn name(&self) -> &str {
        "Assemble"
    }

    fn description(&self) -> &str {
        "Merge fragments into the final transcript"
    }

    fn validate_input(&self, _ctx: &Context, _state: &SourceState) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut SourceState) -> StepResult<StepOutcome> {
        let logical = state.logical_name.clone();
        let file_name = format!("{logical}.md");

        if !ctx.overwrite() && ctx.store.has_output(Stage::Transcript, &logical) {
            state.transcript_path = Some(ctx.store.stage_dir(Stage::Transcript).join(&file_name));
            return Ok(StepOutcome::Skipped(
                "transcript already assembled".to_string(),
            ));
        }

        let expected = state
            .require_metadata()
            .map_err(StepError::invalid_input)?
            .segment_count;
        let policy = ctx.settings.assembly.policy;

        let record = assemble(&logical, expected, state.fragments.clone(), policy).map_err(
            |e| match &e {
                AssembleError::Incomplete { .. } => StepError::incomplete_fragments(e.to_string()),
                AssembleError::Empty(_) => StepError::invalid_input(e.to_string()),
            },
        )?;

        let body = record.render(ctx.settings.assembly.tag_language);
        let path = ctx
            .store
            .write_bytes(Stage::Transcript, &file_name, body.as_bytes())
            .map_err(|e| StepError::io_error("write transcript", e))?;

        ctx.logger.success(&format!(
            "[{logical}] Transcript assembled from {} fragment(s)",
            record.fragments.len()
        ));
        state.transcript_path = Some(path);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &SourceState) -> StepResult<()> {
        if !ctx.store.has_output(Stage::Transcript, &state.logical_name) {
            return Err(StepError::invalid_output("transcript not committed"));
        }
        match &state.transcript_path {
            Some(path) if path.exists() => Ok(()),
            _ => Err(StepError::invalid_output("transcript file missing")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssemblyPolicy, Fragment, SegmentMetadata};
    use crate::orchestrator::testkit::{audio_input, test_context};

    fn state_with_fragments(
        fixture: &crate::orchestrator::testkit::Fixture,
        name: &str,
        count: usize,
        fragments: Vec<Fragment>,
    ) -> SourceState {
        let mut state = SourceState::new(audio_input(fixture, name));
        state.metadata = Some(SegmentMetadata::new(name, "en", count));
        state.fragments = fragments;
        state
    }

    #[test]
    fn writes_the_rendered_transcript() {
        let (ctx, fixture) = test_context();
        let fragments = vec![
            Fragment::new(0, "en", "first part"),
            Fragment::new(1, "en", "second part"),
        ];
        let mut state = state_with_fragments(&fixture, "talk", 2, fragments);

        let step = AssembleStep::new();
        let outcome = step.execute(&ctx, &mut state).unwrap();

        assert_eq!(outcome, StepOutcome::Success);
        let path = state.transcript_path.clone().unwrap();
        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.starts_with("# talk\n"));
        assert!(body.contains("first part"));
        assert!(body.contains("second part"));
        step.validate_output(&ctx, &state).unwrap();
    }

    #[test]
    fn strict_policy_turns_gaps_into_incomplete_fragments() {
        let (mut ctx, fixture) = test_context();
        ctx.settings.assembly.policy = AssemblyPolicy::Strict;
        let fragments = vec![Fragment::new(0, "en", "only part")];
        let mut state = state_with_fragments(&fixture, "talk", 3, fragments);

        let err = AssembleStep::new().execute(&ctx, &mut state).unwrap_err();
        assert_eq!(err.kind(), "incomplete-fragments");
        assert!(!ctx.store.has_output(Stage::Transcript, "talk"));
    }

    #[test]
    fn lenient_policy_fills_gaps_with_placeholders() {
        let (mut ctx, fixture) = test_context();
        ctx.settings.assembly.policy = AssemblyPolicy::Lenient;
        let fragments = vec![Fragment::new(0, "en", "opening"), Fragment::new(2, "en", "closing")];
        let mut state = state_with_fragments(&fixture, "talk", 3, fragments);

        AssembleStep::new().execute(&ctx, &mut state).unwrap();

        let body = std::fs::read_to_string(state.transcript_path.as_ref().unwrap()).unwrap();
        assert!(body.contains("[missing segment 1]"));
    }

    #[test]
    fn existing_transcript_is_kept() {
        let (ctx, fixture) = test_context();
        ctx.store
            .write_bytes(Stage::Transcript, "talk.md", b"# talk\n\nalready here\n")
            .unwrap();
        let mut state = state_with_fragments(&fixture, "talk", 1, vec![]);

        let outcome = AssembleStep::new().execute(&ctx, &mut state).unwrap();

        assert!(matches!(outcome, StepOutcome::Skipped(_)));
        let body =
            std::fs::read_to_string(state.transcript_path.as_ref().unwrap()).unwrap();
        assert!(body.contains("already here"));
    }

    #[test]
    fn no_fragments_without_transcript_is_rejected() {
        let (ctx, fixture) = test_context();
        let mut state = state_with_fragments(&fixture, "talk", 2, vec![]);

        let err = AssembleStep::new().execute(&ctx, &mut state).unwrap_err();
        assert_eq!(err.kind(), "invalid-input");
    }
}
