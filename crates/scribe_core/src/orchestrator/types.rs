//! Core types for the pipeline orchestrator.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::engine::{MediaEngine, TranscriptionBackend};
use crate::logging::RunLogger;
use crate::models::{Fragment, MediaArtifact, SegmentMetadata, Stage};
use crate::store::StageStore;

/// Outcome of a step execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed and produced output.
    Success,
    /// Step decided it had nothing to do (with a reason).
    Skipped(String),
}

/// Read-only context shared by every step of a run.
///
/// Steps read configuration and shared resources from here; everything
/// mutable and per-source lives in [`SourceState`].
pub struct Context {
    /// Application settings.
    pub settings: Settings,
    /// The stage store for this run.
    pub store: Arc<StageStore>,
    /// Media engine for conversion, splitting and enhancement.
    pub engine: Arc<dyn MediaEngine>,
    /// Transcription backend, when one is configured.
    pub transcriber: Option<Arc<dyn TranscriptionBackend>>,
    /// Run-wide logger.
    pub logger: Arc<RunLogger>,
    /// Scratch directory for this run's tool output.
    pub work_dir: PathBuf,
}

impl Context {
    pub fn new(
        settings: Settings,
        store: Arc<StageStore>,
        engine: Arc<dyn MediaEngine>,
        transcriber: Option<Arc<dyn TranscriptionBackend>>,
        logger: Arc<RunLogger>,
        work_dir: PathBuf,
    ) -> Self {
        Self {
            settings,
            store,
            engine,
            transcriber,
            logger,
            work_dir,
        }
    }

    /// Whether existing outputs should be regenerated.
    pub fn overwrite(&self) -> bool {
        self.settings.pipeline.overwrite
    }

    /// Scratch directory for one source, created on demand.
    pub fn source_work_dir(&self, logical_name: &str) -> std::io::Result<PathBuf> {
        let dir = self.work_dir.join(logical_name);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

/// Mutable state accumulated while one source moves through its
/// pipeline. Steps add data; later steps read it.
#[derive(Debug, Clone)]
pub struct SourceState {
    /// Logical name this state belongs to.
    pub logical_name: String,
    /// The artifact the pipeline started from.
    pub input: MediaArtifact,
    /// Media the next stage-advancing step should consume (set by
    /// convert/render).
    pub working_media: Option<MediaArtifact>,
    /// Committed segment metadata (set by split).
    pub metadata: Option<SegmentMetadata>,
    /// Stage holding the segments transcription should read.
    pub segment_stage: Option<Stage>,
    /// Extracted fragments in index order (set by extract).
    pub fragments: Vec<Fragment>,
    /// Final transcript path (set by assemble).
    pub transcript_path: Option<PathBuf>,
}

impl SourceState {
    /// Create state seeded with the pipeline input.
    pub fn new(input: MediaArtifact) -> Self {
        Self {
            logical_name: input.logical_name.clone(),
            input,
            working_media: None,
            metadata: None,
            segment_stage: None,
            fragments: Vec::new(),
            transcript_path: None,
        }
    }

    /// Segment metadata, or an error message for validation contexts.
    pub fn require_metadata(&self) -> Result<&SegmentMetadata, String> {
        self.metadata
            .as_ref()
            .ok_or_else(|| format!("{}: no committed segments", self.logical_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;

    #[test]
    fn state_is_seeded_from_the_input() {
        let artifact = MediaArtifact::new(
            "/store/RawAUDIO/standup.wav",
            "standup",
            MediaKind::Audio,
            Stage::RawAudio,
        );
        let state = SourceState::new(artifact);
        assert_eq!(state.logical_name, "standup");
        assert!(state.working_media.is_none());
        assert!(state.require_metadata().is_err());
    }
}
