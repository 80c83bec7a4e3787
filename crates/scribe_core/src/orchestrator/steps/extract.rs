//! Extract step - distill committed segment pages into plain transcript
//! fragments.
//!
//! Missing or unreadable pages are logged and skipped here; whether the
//! resulting gaps are acceptable is the assembly policy's call.

use std::fs;
use std::io::ErrorKind;

use crate::engine::extract_html_text;
use crate::models::{Fragment, Stage};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, SourceState, StepOutcome};

/// Extract step for reducing segment HTML pages to their transcript text.
pub struct ExtractStep;

impl ExtractStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExtractStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for ExtractStep {
    fn name(&self) -> &str {
        "Extract"
    }

    fn description(&self) -> &str {
        "Distill segment pages into transcript fragments"
    }

    fn validate_input(&self, _ctx: &Context, state: &SourceState) -> StepResult<()> {
        state.require_metadata().map_err(StepError::invalid_input)?;
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut SourceState) -> StepResult<StepOutcome> {
        let logical = state.logical_name.clone();

        if !ctx.overwrite() && ctx.store.has_output(Stage::Transcript, &logical) {
            return Ok(StepOutcome::Skipped(
                "transcript already assembled".to_string(),
            ));
        }

        let meta = state
            .require_metadata()
            .map_err(StepError::invalid_input)?
            .clone();
        let html_dir = ctx.store.stage_dir(Stage::Html);

        let mut fragments = Vec::new();
        for idx in &meta.segments {
            let page_name = format!("{logical}_part{idx:03}.html");
            let html = match fs::read_to_string(html_dir.join(&page_name)) {
                Ok(html) => html,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    ctx.logger
                        .warn(&format!("[{logical}] Segment page {page_name} is missing"));
                    continue;
                }
                Err(e) => return Err(StepError::io_error("read segment page", e)),
            };
            match extract_html_text(&html) {
                Ok(doc) => fragments.push(Fragment::new(*idx, &meta.language, doc.text)),
                Err(e) => {
                    ctx.logger.warn(&format!(
                        "[{logical}] Segment page {page_name} unreadable: {e}"
                    ));
                }
            }
        }

        if fragments.is_empty() {
            return Err(StepError::extraction_failure(format!(
                "{logical}: no segment pages could be distilled"
            )));
        }

        ctx.logger.info(&format!(
            "[{logical}] Distilled {} of {} fragment(s)",
            fragments.len(),
            meta.segment_count
        ));
        state.fragments = fragments;
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &SourceState) -> StepResult<()> {
        if state.fragments.is_empty() {
            return Err(StepError::invalid_output("no fragments extracted"));
        }
        let ordered = state
            .fragments
            .windows(2)
            .all(|pair| pair[0].index < pair[1].index);
        if !ordered {
            return Err(StepError::invalid_output("fragments out of order"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::steps::split::SplitStep;
    use crate::orchestrator::steps::transcribe::TranscribeStep;
    use crate::orchestrator::testkit::{audio_input, test_context, Fixture};

    fn transcribed_state(ctx: &Context, fixture: &Fixture, name: &str) -> SourceState {
        let input = audio_input(fixture, name);
        let mut state = SourceState::new(input.clone());
        state.working_media = Some(input);
        SplitStep::new().execute(ctx, &mut state).unwrap();
        TranscribeStep::new().execute(ctx, &mut state).unwrap();
        state
    }

    #[test]
    fn distills_pages_into_ordered_fragments() {
        let (ctx, fixture) = test_context();
        let mut state = transcribed_state(&ctx, &fixture, "talk");

        let step = ExtractStep::new();
        let outcome = step.execute(&ctx, &mut state).unwrap();

        assert_eq!(outcome, StepOutcome::Success);
        let indices: Vec<usize> = state.fragments.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(state.fragments[0].text.contains("spoken words of talk_part000"));
        assert_eq!(state.fragments[0].language, "en");
        step.validate_output(&ctx, &state).unwrap();
    }

    #[test]
    fn missing_page_leaves_a_gap_for_the_policy() {
        let (ctx, fixture) = test_context();
        let mut state = transcribed_state(&ctx, &fixture, "talk");
        std::fs::remove_file(ctx.store.stage_dir(Stage::Html).join("talk_part001.html")).unwrap();

        let outcome = ExtractStep::new().execute(&ctx, &mut state).unwrap();

        assert_eq!(outcome, StepOutcome::Success);
        let indices: Vec<usize> = state.fragments.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn no_readable_pages_is_an_extraction_failure() {
        let (ctx, fixture) = test_context();
        let mut state = transcribed_state(&ctx, &fixture, "talk");
        for idx in 0..3 {
            std::fs::remove_file(
                ctx.store
                    .stage_dir(Stage::Html)
                    .join(format!("talk_part{idx:03}.html")),
            )
            .unwrap();
        }

        let err = ExtractStep::new().execute(&ctx, &mut state).unwrap_err();
        assert_eq!(err.kind(), "extraction-failure");
    }

    #[test]
    fn finished_transcript_skips_extraction() {
        let (ctx, fixture) = test_context();
        let mut state = transcribed_state(&ctx, &fixture, "talk");
        ctx.store
            .write_bytes(Stage::Transcript, "talk.md", b"# talk\n")
            .unwrap();

        let outcome = ExtractStep::new().execute(&ctx, &mut state).unwrap();
        assert!(matches!(outcome, StepOutcome::Skipped(_)));
        assert!(state.fragments.is_empty());
    }
}
