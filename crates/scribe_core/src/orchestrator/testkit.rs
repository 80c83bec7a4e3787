//! Shared fakes and fixtures for orchestrator tests.
//!
//! The fakes stand in for the external tools: the engine writes small
//! placeholder files instead of calling ffmpeg, the transcriber emits a
//! readable article page instead of running a speech model. Call counts
//! let tests assert that committed stores are not reprocessed.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;

use crate::config::Settings;
use crate::engine::{EngineError, EngineResult, MediaEngine, TranscriptionBackend};
use crate::logging::RunLogger;
use crate::models::{segment_file_name, MediaArtifact, MediaKind, Stage};
use crate::orchestrator::types::Context;
use crate::store::StageStore;

/// Fake media engine: writes placeholder output files and counts calls.
pub(crate) struct CountingEngine {
    extracts: AtomicUsize,
    renders: AtomicUsize,
    splits: AtomicUsize,
    enhances: AtomicUsize,
    /// Number of segment files `split` fabricates per call.
    pub segments_per_split: usize,
    /// When set, `enhance` fails with a command error.
    pub fail_enhance: AtomicBool,
}

impl CountingEngine {
    pub fn new() -> Self {
        Self {
            extracts: AtomicUsize::new(0),
            renders: AtomicUsize::new(0),
            splits: AtomicUsize::new(0),
            enhances: AtomicUsize::new(0),
            segments_per_split: 3,
            fail_enhance: AtomicBool::new(false),
        }
    }

    pub fn with_segments(count: usize) -> Self {
        Self {
            segments_per_split: count,
            ..Self::new()
        }
    }

    pub fn extract_calls(&self) -> usize {
        self.extracts.load(Ordering::SeqCst)
    }

    pub fn render_calls(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn split_calls(&self) -> usize {
        self.splits.load(Ordering::SeqCst)
    }

    pub fn enhance_calls(&self) -> usize {
        self.enhances.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.extract_calls() + self.render_calls() + self.split_calls() + self.enhance_calls()
    }
}

impl MediaEngine for CountingEngine {
    fn extract_audio(&self, _input: &Path, output: &Path) -> EngineResult<()> {
        self.extracts.fetch_add(1, Ordering::SeqCst);
        fs::write(output, b"fake pcm audio")?;
        Ok(())
    }

    fn render_video(&self, _input: &Path, output: &Path) -> EngineResult<()> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        fs::write(output, b"fake mp4 video")?;
        Ok(())
    }

    fn split(
        &self,
        input: &Path,
        out_dir: &Path,
        logical_name: &str,
        _chunk_seconds: u64,
    ) -> EngineResult<Vec<PathBuf>> {
        self.splits.fetch_add(1, Ordering::SeqCst);
        let ext = input
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("wav")
            .to_string();
        let mut produced = Vec::new();
        for index in 0..self.segments_per_split {
            let path = out_dir.join(segment_file_name(logical_name, index, &ext));
            fs::write(&path, format!("fake segment {index}"))?;
            produced.push(path);
        }
        Ok(produced)
    }

    fn enhance(
        &self,
        input: &Path,
        output: &Path,
        _settings: &crate::config::EnhanceSettings,
    ) -> EngineResult<()> {
        self.enhances.fetch_add(1, Ordering::SeqCst);
        if self.fail_enhance.load(Ordering::SeqCst) {
            return Err(EngineError::CommandFailed {
                tool: "ffmpeg".to_string(),
                code: 1,
                message: "synthetic enhancement failure".to_string(),
            });
        }
        fs::copy(input, output)?;
        Ok(())
    }

    fn duration_secs(&self, _input: &Path) -> EngineResult<f64> {
        Ok(120.0)
    }
}

/// Fake transcriber: writes a readable article page for each segment.
pub(crate) struct CountingTranscriber {
    calls: AtomicUsize,
    /// Input stems that should fail with a command error.
    pub fail_stems: Mutex<Vec<String>>,
}

impl CountingTranscriber {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_stems: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_on(&self, stem: &str) {
        self.fail_stems.lock().push(stem.to_string());
    }
}

impl TranscriptionBackend for CountingTranscriber {
    fn transcribe(&self, input: &Path, output: &Path) -> EngineResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("segment")
            .to_string();
        if self.fail_stems.lock().iter().any(|s| s == &stem) {
            return Err(EngineError::CommandFailed {
                tool: "faketool".to_string(),
                code: 1,
                message: format!("refused to transcribe {stem}"),
            });
        }
        fs::write(output, article_page(&format!("spoken words of {stem}")))?;
        Ok(())
    }
}

/// HTML page with enough body text for readability extraction, carrying
/// `marker` in its first paragraph so tests can trace it to the output.
pub(crate) fn article_page(marker: &str) -> String {
    let mut paragraphs = format!(
        "<p>Transcript opening, {marker}, recorded and archived for later \
         review together with the rest of the session material.</p>"
    );
    for i in 0..7 {
        paragraphs.push_str(&format!(
            "<p>Passage {i}: the speaker continues through the agenda, covering \
             the migration plan, the open staffing questions and the schedule \
             for the remaining work across the teams involved.</p>"
        ));
    }
    format!(
        "<!DOCTYPE html><html><head><title>Session transcript</title></head>\
         <body><nav><a href=\"/\">home</a></nav><article><h1>Session \
         transcript</h1>{paragraphs}</article></body></html>"
    )
}

/// Everything a step test needs to keep alive alongside its `Context`.
pub(crate) struct Fixture {
    /// Held so the scratch directory outlives the test body.
    _tmp: TempDir,
    pub store: Arc<StageStore>,
    pub engine: Arc<CountingEngine>,
    pub transcriber: Arc<CountingTranscriber>,
}

/// Settings tuned for fast tests, rooted in a scratch directory.
pub(crate) fn test_settings(root: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.paths.store_root = root.join("store").to_string_lossy().into_owned();
    settings.paths.logs_folder = root.join("logs").to_string_lossy().into_owned();
    settings.paths.work_folder = root.join("work").to_string_lossy().into_owned();
    settings.pipeline.workers = 2;
    settings.scraper.login_timeout_secs = 1;
    settings.scraper.poll_interval_ms = 5;
    settings
}

/// Build a context over a fresh store with counting fakes.
pub(crate) fn test_context() -> (Context, Fixture) {
    test_context_with(CountingEngine::new())
}

/// Same as [`test_context`] but with a caller-configured engine.
pub(crate) fn test_context_with(engine: CountingEngine) -> (Context, Fixture) {
    let tmp = TempDir::new().unwrap();
    let settings = test_settings(tmp.path());
    let store = Arc::new(StageStore::open(settings.store_root()).unwrap());
    let engine = Arc::new(engine);
    let transcriber = Arc::new(CountingTranscriber::new());
    let logger = Arc::new(
        RunLogger::new("test-run", settings.logs_dir(), settings.log_config(), None).unwrap(),
    );
    let work_dir = settings.work_dir();
    fs::create_dir_all(&work_dir).unwrap();

    let ctx = Context::new(
        settings,
        Arc::clone(&store),
        Arc::clone(&engine) as Arc<dyn MediaEngine>,
        Some(Arc::clone(&transcriber) as Arc<dyn TranscriptionBackend>),
        logger,
        work_dir,
    );
    let fixture = Fixture {
        _tmp: tmp,
        store,
        engine,
        transcriber,
    };
    (ctx, fixture)
}

/// Drop a raw audio file into the store and return its artifact.
pub(crate) fn audio_input(fixture: &Fixture, name: &str) -> MediaArtifact {
    stage_input(fixture, name, Stage::RawAudio, MediaKind::Audio, "wav")
}

/// Drop a raw video file into the store and return its artifact.
pub(crate) fn video_input(fixture: &Fixture, name: &str) -> MediaArtifact {
    stage_input(fixture, name, Stage::RawVideo, MediaKind::Video, "mp4")
}

fn stage_input(
    fixture: &Fixture,
    name: &str,
    stage: Stage,
    kind: MediaKind,
    ext: &str,
) -> MediaArtifact {
    let path = fixture.store.stage_dir(stage).join(format!("{name}.{ext}"));
    fs::write(&path, b"fake input media").unwrap();
    fixture.store.record_output(stage, name);
    MediaArtifact::new(path, name, kind, stage)
}
