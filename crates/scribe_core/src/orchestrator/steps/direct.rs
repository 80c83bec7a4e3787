//! Direct transcript steps - one artifact in, one transcript out.
//!
//! `HtmlTranscriptStep` serves saved pages (html-only runs) and
//! `JsonTranscriptStep` serves scraped row files (the tail of a
//! sharepoint run). Neither touches the media stages.

use std::fs;
use std::io::ErrorKind;

use crate::assembler::{assemble, AssembleError};
use crate::engine::extract_html_text;
use crate::models::{Fragment, ScrapedTranscript, Stage};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, SourceState, StepOutcome};

/// Commit a single-fragment transcript for the source.
fn write_single_fragment(
    ctx: &Context,
    state: &mut SourceState,
    fragment: Fragment,
) -> StepResult<StepOutcome> {
    let logical = state.logical_name.clone();
    let record = assemble(&logical, 1, vec![fragment], ctx.settings.assembly.policy).map_err(
        |e| match &e {
            AssembleError::Incomplete { .. } => StepError::incomplete_fragments(e.to_string()),
            AssembleError::Empty(_) => StepError::invalid_input(e.to_string()),
        },
    )?;

    let body = record.render(ctx.settings.assembly.tag_language);
    let path = ctx
        .store
        .write_bytes(Stage::Transcript, &format!("{logical}.md"), body.as_bytes())
        .map_err(|e| StepError::io_error("write transcript", e))?;

    state.transcript_path = Some(path);
    Ok(StepOutcome::Success)
}

fn read_input(state: &SourceState) -> StepResult<String> {
    match fs::read_to_string(&state.input.path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(StepError::file_not_found(state.input.path.display().to_string()))
        }
        Err(e) => Err(StepError::io_error("read input artifact", e)),
    }
}

/// Turns one saved page into a transcript.
pub struct HtmlTranscriptStep;

impl HtmlTranscriptStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HtmlTranscriptStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for HtmlTranscriptStep {
    fn name(&self) -> &str {
        "HtmlTranscript"
    }

    fn description(&self) -> &str {
        "Distill a saved page into a transcript"
    }

    fn validate_input(&self, _ctx: &Context, state: &SourceState) -> StepResult<()> {
        if !state.input.path.exists() {
            return Err(StepError::file_not_found(state.input.path.display().to_string()));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut SourceState) -> StepResult<StepOutcome> {
        let logical = state.logical_name.clone();
        if !ctx.overwrite() && ctx.store.has_output(Stage::Transcript, &logical) {
            state.transcript_path = Some(
                ctx.store
                    .stage_dir(Stage::Transcript)
                    .join(format!("{logical}.md")),
            );
            return Ok(StepOutcome::Skipped(
                "transcript already assembled".to_string(),
            ));
        }

        let html = read_input(state)?;
        let doc = extract_html_text(&html)
            .map_err(|e| StepError::extraction_failure(format!("{logical}: {e}")))?;
        if doc.text.trim().is_empty() {
            return Err(StepError::extraction_failure(format!(
                "{logical}: page has no readable text"
            )));
        }

        ctx.logger
            .info(&format!("[{logical}] Distilled page '{}'", doc.title));
        let fragment = Fragment::new(0, &ctx.settings.pipeline.language, doc.text);
        write_single_fragment(ctx, state, fragment)
    }

    fn validate_output(&self, ctx: &Context, state: &SourceState) -> StepResult<()> {
        if ctx.store.has_output(Stage::Transcript, &state.logical_name) {
            Ok(())
        } else {
            Err(StepError::invalid_output("transcript not committed"))
        }
    }
}

/// Turns one scraped row file into a transcript.
pub struct JsonTranscriptStep;

impl JsonTranscriptStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonTranscriptStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for JsonTranscriptStep {
    fn name(&self) -> &str {
        "JsonTranscript"
    }

    fn description(&self) -> &str {
        "Convert scraped rows into a transcript"
    }

    fn validate_input(&self, _ctx: &Context, state: &SourceState) -> StepResult<()> {
        if !state.input.path.exists() {
            return Err(StepError::file_not_found(state.input.path.display().to_string()));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut SourceState) -> StepResult<StepOutcome> {
        let logical = state.logical_name.clone();
        if !ctx.overwrite() && ctx.store.has_output(Stage::Transcript, &logical) {
            state.transcript_path = Some(
                ctx.store
                    .stage_dir(Stage::Transcript)
                    .join(format!("{logical}.md")),
            );
            return Ok(StepOutcome::Skipped(
                "transcript already assembled".to_string(),
            ));
        }

        let text = read_input(state)?;
        let scraped: ScrapedTranscript = serde_json::from_str(&text)
            .map_err(|e| StepError::parse("transcript json", e.to_string()))?;

        let body = scraped.rows_text();
        if body.trim().is_empty() {
            return Err(StepError::extraction_failure(format!(
                "{logical}: no rows with text"
            )));
        }

        ctx.logger
            .info(&format!("[{logical}] Collated {} row(s)", scraped.rows.len()));
        // Scraped rows carry no language tag.
        let fragment = Fragment::new(0, "", body);
        write_single_fragment(ctx, state, fragment)
    }

    fn validate_output(&self, ctx: &Context, state: &SourceState) -> StepResult<()> {
        if ctx.store.has_output(Stage::Transcript, &state.logical_name) {
            Ok(())
        } else {
            Err(StepError::invalid_output("transcript not committed"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaArtifact, MediaKind, TranscriptRow};
    use crate::orchestrator::testkit::{article_page, test_context};

    fn html_artifact(ctx: &Context, name: &str, html: &str) -> MediaArtifact {
        let path = ctx
            .store
            .write_bytes(Stage::Html, &format!("{name}.html"), html.as_bytes())
            .unwrap();
        MediaArtifact::new(path, name, MediaKind::Html, Stage::Html)
    }

    fn json_artifact(ctx: &Context, name: &str, scraped: &ScrapedTranscript) -> MediaArtifact {
        let path = ctx
            .store
            .write_json(Stage::Json, &format!("{name}.json"), scraped)
            .unwrap();
        MediaArtifact::new(path, name, MediaKind::Json, Stage::Json)
    }

    #[test]
    fn saved_page_becomes_a_transcript() {
        let (ctx, _fixture) = test_context();
        let input = html_artifact(&ctx, "notes", &article_page("html only material"));
        let mut state = SourceState::new(input);

        let step = HtmlTranscriptStep::new();
        let outcome = step.execute(&ctx, &mut state).unwrap();

        assert_eq!(outcome, StepOutcome::Success);
        let body = std::fs::read_to_string(state.transcript_path.as_ref().unwrap()).unwrap();
        assert!(body.starts_with("# notes\n"));
        assert!(body.contains("html only material"));
        step.validate_output(&ctx, &state).unwrap();
    }

    #[test]
    fn empty_page_is_an_extraction_failure() {
        let (ctx, _fixture) = test_context();
        let input = html_artifact(&ctx, "blank", "<html><body></body></html>");
        let mut state = SourceState::new(input);

        let err = HtmlTranscriptStep::new()
            .execute(&ctx, &mut state)
            .unwrap_err();
        assert_eq!(err.kind(), "extraction-failure");
    }

    #[test]
    fn scraped_rows_become_a_transcript() {
        let (ctx, _fixture) = test_context();
        let scraped = ScrapedTranscript {
            name: "standup".to_string(),
            url: "https://example.org/stream.aspx?id=1".to_string(),
            rows: vec![
                TranscriptRow {
                    index: 0,
                    timestamp: "00:01".to_string(),
                    speaker: "Dana".to_string(),
                    text: "welcome everyone".to_string(),
                },
                TranscriptRow {
                    index: 1,
                    timestamp: "00:09".to_string(),
                    speaker: "Robin".to_string(),
                    text: "let us get started".to_string(),
                },
            ],
        };
        let input = json_artifact(&ctx, "standup", &scraped);
        let mut state = SourceState::new(input);

        let outcome = JsonTranscriptStep::new().execute(&ctx, &mut state).unwrap();

        assert_eq!(outcome, StepOutcome::Success);
        let body = std::fs::read_to_string(state.transcript_path.as_ref().unwrap()).unwrap();
        assert!(body.contains("welcome everyone"));
        assert!(body.contains("let us get started"));
        assert!(ctx.store.has_output(Stage::Transcript, "standup"));
    }

    #[test]
    fn malformed_row_file_is_a_parse_error() {
        let (ctx, _fixture) = test_context();
        let path = ctx
            .store
            .write_bytes(Stage::Json, "broken.json", b"{\"name\": ")
            .unwrap();
        let input = MediaArtifact::new(path, "broken", MediaKind::Json, Stage::Json);
        let mut state = SourceState::new(input);

        let err = JsonTranscriptStep::new()
            .execute(&ctx, &mut state)
            .unwrap_err();
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn finished_transcripts_are_skipped() {
        let (ctx, _fixture) = test_context();
        ctx.store
            .write_bytes(Stage::Transcript, "notes.md", b"# notes\n\nkept\n")
            .unwrap();
        let input = html_artifact(&ctx, "notes", &article_page("replacement"));
        let mut state = SourceState::new(input);

        let outcome = HtmlTranscriptStep::new().execute(&ctx, &mut state).unwrap();

        assert!(matches!(outcome, StepOutcome::Skipped(_)));
        let body = std::fs::read_to_string(state.transcript_path.as_ref().unwrap()).unwrap();
        assert!(body.contains("kept"));
    }
}
