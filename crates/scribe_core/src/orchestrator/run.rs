//! Run processor: route the store to a pipeline and drive every source
//! through it.
//!
//! A run opens the store, picks a pipeline from what is on disk, runs
//! the scrape phase first when link catalogs call for it (one browser,
//! strictly serial), then fans the per-source pipelines out over a
//! small worker pool. Failures stay with their source; the run ends
//! with a summary grouped by error kind.

use std::collections::BTreeMap;
use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::unbounded;

use crate::catalog::{load_link_catalogs, CatalogError};
use crate::config::Settings;
use crate::engine::{CommandTranscriber, FfmpegEngine, MediaEngine, TranscriptionBackend};
use crate::logging::{generate_run_id, LogSink, RunLogger};
use crate::models::{MediaArtifact, PipelineKind, RunMode, Stage};
use crate::scraper::{ChromeSource, LinkOutcome, SessionController, TranscriptSource};
use crate::store::StageStore;

use super::create_pipeline;
use super::errors::{RunError, RunResult, StepError};
use super::pipeline::{CancelHandle, Pipeline, PipelineRunResult};
use super::router::{select_pipeline, StageSnapshot};
use super::types::{Context, SourceState};

/// How one source ended.
#[derive(Debug, Clone)]
pub enum SourceOutcome {
    /// Pipeline ran to the end.
    Completed {
        steps_completed: Vec<String>,
        steps_skipped: Vec<String>,
    },
    /// Pipeline failed at a step.
    Failed {
        step: String,
        kind: &'static str,
        message: String,
    },
    /// Scrape phase wrote this link's transcript JSON.
    Saved { rows: usize },
    /// Nothing was done for this source.
    Skipped { reason: String },
}

/// One line of the end-of-run summary.
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub name: String,
    pub outcome: SourceOutcome,
}

impl SourceReport {
    fn completed(name: impl Into<String>, result: PipelineRunResult) -> Self {
        Self {
            name: name.into(),
            outcome: SourceOutcome::Completed {
                steps_completed: result.steps_completed,
                steps_skipped: result.steps_skipped,
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, SourceOutcome::Failed { .. })
    }

    /// Short human-readable outcome for summary lines.
    pub fn label(&self) -> String {
        match &self.outcome {
            SourceOutcome::Completed {
                steps_completed,
                steps_skipped,
            } => {
                if steps_completed.is_empty() && !steps_skipped.is_empty() {
                    "unchanged".to_string()
                } else {
                    format!(
                        "done ({} step(s), {} skipped)",
                        steps_completed.len(),
                        steps_skipped.len()
                    )
                }
            }
            SourceOutcome::Failed { step, kind, .. } => format!("failed at {step} [{kind}]"),
            SourceOutcome::Saved { rows } => format!("saved ({rows} row(s))"),
            SourceOutcome::Skipped { reason } => format!("skipped: {reason}"),
        }
    }
}

/// Everything a finished run reports.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub pipeline: PipelineKind,
    /// Per-source outcomes: scrape results first, then pipeline results,
    /// each batch sorted by name.
    pub sources: Vec<SourceReport>,
}

impl RunSummary {
    /// Sources that produced output this run.
    pub fn completed_count(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| {
                matches!(
                    s.outcome,
                    SourceOutcome::Completed { .. } | SourceOutcome::Saved { .. }
                )
            })
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.sources.iter().filter(|s| s.is_failure()).count()
    }

    /// Failure counts grouped by stable error kind.
    pub fn failures_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut by_kind = BTreeMap::new();
        for report in &self.sources {
            if let SourceOutcome::Failed { kind, .. } = &report.outcome {
                *by_kind.entry(*kind).or_insert(0) += 1;
            }
        }
        by_kind
    }

    /// Whether every source failed (exit-code material for the CLI).
    pub fn all_failed(&self) -> bool {
        !self.sources.is_empty() && self.sources.iter().all(|s| s.is_failure())
    }

    fn log(&self, logger: &RunLogger) {
        logger.section("Summary");
        for report in &self.sources {
            logger.info(&format!("  {} - {}", report.name, report.label()));
        }

        let failures = self.failures_by_kind();
        if failures.is_empty() {
            logger.success(&format!("All {} source(s) processed", self.sources.len()));
        } else {
            for (kind, count) in &failures {
                logger.warn(&format!("{count} failure(s): {kind}"));
            }
        }
    }
}

/// Drives one complete run over a stage store.
pub struct RunProcessor {
    settings: Settings,
    cancelled: Arc<AtomicBool>,
    log_sink: Option<LogSink>,
    transcript_source: Option<Box<dyn TranscriptSource>>,
    engine_override: Option<Arc<dyn MediaEngine>>,
    transcriber_override: Option<Arc<dyn TranscriptionBackend>>,
}

impl RunProcessor {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            cancelled: Arc::new(AtomicBool::new(false)),
            log_sink: None,
            transcript_source: None,
            engine_override: None,
            transcriber_override: None,
        }
    }

    /// Echo every run-log line to this sink (console output).
    pub fn with_log_sink(mut self, sink: LogSink) -> Self {
        self.log_sink = Some(sink);
        self
    }

    /// Replace the browser-backed transcript source (tests, alternative
    /// drivers). Consumed by the first scrape phase.
    pub fn with_transcript_source(mut self, source: Box<dyn TranscriptSource>) -> Self {
        self.transcript_source = Some(source);
        self
    }

    /// Replace the ffmpeg-backed media engine.
    pub fn with_engine(mut self, engine: Arc<dyn MediaEngine>) -> Self {
        self.engine_override = Some(engine);
        self
    }

    /// Replace the command-template transcription backend.
    pub fn with_transcription_backend(mut self, backend: Arc<dyn TranscriptionBackend>) -> Self {
        self.transcriber_override = Some(backend);
        self
    }

    /// Handle that stops every in-flight pipeline at its next step
    /// boundary.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::from_flag(Arc::clone(&self.cancelled))
    }

    /// Execute one run in the requested mode.
    pub fn run(&mut self, mode: RunMode) -> RunResult<RunSummary> {
        let store_root = self.settings.store_root();
        let store = Arc::new(
            StageStore::open(&store_root)
                .map_err(|e| RunError::stage_io(format!("{}: {e}", store_root.display())))?,
        );

        let run_id = generate_run_id();
        let logger = Arc::new(
            RunLogger::new(
                &run_id,
                self.settings.logs_dir(),
                self.settings.log_config(),
                self.log_sink.take(),
            )
            .map_err(|e| RunError::stage_io(format!("open run log: {e}")))?,
        );

        logger.section("Run");
        logger.info(&format!("Run id: {run_id}"));
        logger.info(&format!("Store: {}", store.root().display()));
        logger.info(&format!("Mode: {mode}"));

        let snapshot = StageSnapshot::capture(&store);
        let kind = select_pipeline(&snapshot, mode)?;
        logger.info(&format!("Pipeline: {kind}"));

        let work_dir = self.settings.work_dir().join(&run_id);
        fs::create_dir_all(&work_dir)
            .map_err(|e| RunError::stage_io(format!("create work dir: {e}")))?;

        let engine = match &self.engine_override {
            Some(engine) => Arc::clone(engine),
            None => Arc::new(FfmpegEngine::new(&self.settings.engine)) as Arc<dyn MediaEngine>,
        };
        let transcriber = self.build_transcriber(&logger)?;

        let ctx = Arc::new(Context::new(
            self.settings.clone(),
            Arc::clone(&store),
            engine,
            transcriber,
            Arc::clone(&logger),
            work_dir.clone(),
        ));

        let mut reports = Vec::new();
        if kind == PipelineKind::SharePoint {
            reports.extend(self.scrape_phase(&ctx)?);
        }

        let items = self.work_items(&store, kind)?;
        logger.info(&format!("{} source(s) queued", items.len()));
        reports.extend(self.process_items(&ctx, kind, items));

        let summary = RunSummary {
            run_id,
            pipeline: kind,
            sources: reports,
        };
        summary.log(&logger);

        if let Err(e) = fs::remove_dir_all(&work_dir) {
            logger.debug(&format!("Work dir not removed: {e}"));
        }
        logger.close();
        Ok(summary)
    }

    fn build_transcriber(
        &self,
        logger: &RunLogger,
    ) -> RunResult<Option<Arc<dyn TranscriptionBackend>>> {
        if let Some(backend) = &self.transcriber_override {
            return Ok(Some(Arc::clone(backend)));
        }
        match &self.settings.engine.transcriber_command {
            Some(template) => {
                let backend = CommandTranscriber::new(template.clone())
                    .map_err(|e| RunError::config(e.to_string()))?;
                logger.command(template);
                Ok(Some(Arc::new(backend)))
            }
            None => Ok(None),
        }
    }

    /// Scrape every catalog link into the row-file stage, one browser
    /// session for the whole batch.
    ///
    /// A browser that cannot launch fails every pending link but not the
    /// run; leftover row files still get converted afterwards.
    fn scrape_phase(&mut self, ctx: &Context) -> RunResult<Vec<SourceReport>> {
        // A store with leftover row files but no catalog resumes the
        // conversion tail without scraping anything.
        let links = match load_link_catalogs(&ctx.store.stage_dir(Stage::RawLink)) {
            Ok(links) => links,
            Err(CatalogError::NoCatalog(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if links.is_empty() {
            return Ok(Vec::new());
        }

        ctx.logger.phase("Scrape");
        ctx.logger.info(&format!("{} link(s) in catalog", links.len()));

        let source = match self.transcript_source.take() {
            Some(source) => source,
            None => {
                match ChromeSource::launch(&ctx.settings.scraper, &ctx.settings.profile_dir()) {
                    Ok(chrome) => Box::new(chrome) as Box<dyn TranscriptSource>,
                    Err(e) => {
                        ctx.logger.error(&format!("Browser launch failed: {e}"));
                        let step_err = StepError::from(e);
                        let kind = step_err.kind();
                        let message = step_err.to_string();
                        return Ok(links
                            .into_iter()
                            .map(|link| SourceReport {
                                name: link.name,
                                outcome: SourceOutcome::Failed {
                                    step: "Scrape".to_string(),
                                    kind,
                                    message: message.clone(),
                                },
                            })
                            .collect());
                    }
                }
            }
        };

        let mut session = SessionController::new(source, ctx.settings.scraper.clone());
        let link_reports = session.run_catalog(&links, &ctx.store, ctx.overwrite());

        Ok(link_reports
            .into_iter()
            .map(|report| {
                let outcome = match report.outcome {
                    LinkOutcome::Saved { rows } => SourceOutcome::Saved { rows },
                    LinkOutcome::Skipped => SourceOutcome::Skipped {
                        reason: "already scraped".to_string(),
                    },
                    LinkOutcome::Failed(e) => {
                        let step_err = StepError::from(e);
                        SourceOutcome::Failed {
                            step: "Scrape".to_string(),
                            kind: step_err.kind(),
                            message: step_err.to_string(),
                        }
                    }
                };
                SourceReport {
                    name: report.name,
                    outcome,
                }
            })
            .collect())
    }

    /// Work queue for the pipeline phase, one item per logical name.
    fn work_items(
        &self,
        store: &StageStore,
        kind: PipelineKind,
    ) -> RunResult<Vec<MediaArtifact>> {
        let list = |stage: Stage| {
            store
                .list_artifacts(stage)
                .map_err(|e| RunError::stage_io(format!("list {stage}: {e}")))
        };

        let items = match kind {
            PipelineKind::AudioBased | PipelineKind::VideoBased => {
                // A video beats a same-named audio file; the audio it
                // extracts is picked up by the skip checks either way.
                let mut by_name: BTreeMap<String, MediaArtifact> = BTreeMap::new();
                for artifact in list(Stage::RawAudio)? {
                    by_name.insert(artifact.logical_name.clone(), artifact);
                }
                for artifact in list(Stage::RawVideo)? {
                    by_name.insert(artifact.logical_name.clone(), artifact);
                }
                by_name.into_values().collect()
            }
            PipelineKind::HtmlOnly => list(Stage::Html)?,
            PipelineKind::SharePoint => list(Stage::Json)?,
        };
        Ok(items)
    }

    /// Fan the work items out over the worker pool and collect reports.
    fn process_items(
        &self,
        ctx: &Arc<Context>,
        kind: PipelineKind,
        items: Vec<MediaArtifact>,
    ) -> Vec<SourceReport> {
        if items.is_empty() {
            return Vec::new();
        }

        let total = items.len();
        let pipeline = Arc::new(create_pipeline(kind, Arc::clone(&self.cancelled)));
        let workers = self.settings.pipeline.workers.clamp(1, total);
        ctx.logger
            .phase(&format!("Process ({} worker(s))", workers));

        let (work_tx, work_rx) = unbounded::<MediaArtifact>();
        let (report_tx, report_rx) = unbounded::<SourceReport>();
        for item in items {
            if work_tx.send(item).is_err() {
                break;
            }
        }
        drop(work_tx);

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let work_rx = work_rx.clone();
            let report_tx = report_tx.clone();
            let ctx = Arc::clone(ctx);
            let pipeline = Arc::clone(&pipeline);
            handles.push(thread::spawn(move || {
                while let Ok(artifact) = work_rx.recv() {
                    let report = process_source(&ctx, &pipeline, artifact);
                    if report_tx.send(report).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(report_tx);

        let mut reports: Vec<SourceReport> = Vec::with_capacity(total);
        for report in report_rx.iter() {
            reports.push(report);
            ctx.logger.progress((reports.len() * 100 / total) as u32);
        }
        for handle in handles {
            if handle.join().is_err() {
                ctx.logger.error("A worker thread panicked");
            }
        }
        reports.sort_by(|a, b| a.name.cmp(&b.name));
        reports
    }
}

/// Run one source through the pipeline under its claim.
fn process_source(ctx: &Context, pipeline: &Pipeline, artifact: MediaArtifact) -> SourceReport {
    let name = artifact.logical_name.clone();
    let Some(_claim) = ctx.store.claim(&name) else {
        return SourceReport {
            name,
            outcome: SourceOutcome::Skipped {
                reason: "claimed by another worker".to_string(),
            },
        };
    };

    ctx.logger
        .info(&format!("[{name}] Starting ({})", artifact.kind));
    let mut state = SourceState::new(artifact);

    match pipeline.run(ctx, &mut state) {
        Ok(result) => SourceReport::completed(name, result),
        Err(e) => SourceReport {
            name,
            outcome: SourceOutcome::Failed {
                step: e.step_name().to_string(),
                kind: e.kind(),
                message: e.to_string(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TranscriptRow;
    use crate::orchestrator::testkit::{article_page, test_settings, CountingEngine, CountingTranscriber};
    use crate::scraper::{PageProbe, ScrapeResult};
    use std::path::Path;
    use tempfile::TempDir;

    fn seeded_store(settings: &Settings) -> StageStore {
        StageStore::open(settings.store_root()).unwrap()
    }

    fn audio_run_fixture() -> (TempDir, Settings) {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let store = seeded_store(&settings);
        fs::write(store.stage_dir(Stage::RawAudio).join("clip.wav"), b"media").unwrap();
        (tmp, settings)
    }

    #[test]
    fn audio_run_produces_an_ordered_transcript() {
        let (_tmp, settings) = audio_run_fixture();
        let engine = Arc::new(CountingEngine::new());
        let transcriber = Arc::new(CountingTranscriber::new());

        let summary = RunProcessor::new(settings.clone())
            .with_engine(engine.clone())
            .with_transcription_backend(transcriber.clone())
            .run(RunMode::Auto)
            .unwrap();

        assert_eq!(summary.pipeline, PipelineKind::AudioBased);
        assert_eq!(summary.sources.len(), 1);
        assert!(!summary.sources[0].is_failure());
        assert_eq!(engine.split_calls(), 1);
        assert_eq!(transcriber.calls(), 3);

        let store = seeded_store(&settings);
        assert!(store.has_output(Stage::Transcript, "clip"));
        let body =
            fs::read_to_string(store.stage_dir(Stage::Transcript).join("clip.md")).unwrap();
        let first = body.find("spoken words of clip_part000").unwrap();
        let last = body.find("spoken words of clip_part002").unwrap();
        assert!(first < last);
    }

    #[test]
    fn second_run_over_a_finished_store_does_no_work() {
        let (_tmp, settings) = audio_run_fixture();
        RunProcessor::new(settings.clone())
            .with_engine(Arc::new(CountingEngine::new()))
            .with_transcription_backend(Arc::new(CountingTranscriber::new()))
            .run(RunMode::Auto)
            .unwrap();

        let engine = Arc::new(CountingEngine::new());
        let transcriber = Arc::new(CountingTranscriber::new());
        let summary = RunProcessor::new(settings)
            .with_engine(engine.clone())
            .with_transcription_backend(transcriber.clone())
            .run(RunMode::Auto)
            .unwrap();

        assert_eq!(engine.total_calls(), 0);
        assert_eq!(transcriber.calls(), 0);
        assert_eq!(summary.sources.len(), 1);
        assert_eq!(summary.sources[0].label(), "unchanged");
    }

    /// Scripted source: pages for "alpha" are ready at once, pages for
    /// anything else never leave the pending state.
    struct ScriptedRunSource {
        current: String,
    }

    impl TranscriptSource for ScriptedRunSource {
        fn open(&mut self, url: &str) -> ScrapeResult<()> {
            self.current = url.to_string();
            Ok(())
        }

        fn try_open_panel(&mut self) -> ScrapeResult<bool> {
            Ok(false)
        }

        fn probe(&mut self) -> ScrapeResult<PageProbe> {
            if self.current.contains("alpha") {
                Ok(PageProbe::TranscriptReady)
            } else {
                Ok(PageProbe::Pending)
            }
        }

        fn collect_rows(&mut self) -> ScrapeResult<Vec<TranscriptRow>> {
            Ok(vec![
                TranscriptRow {
                    index: 0,
                    timestamp: "00:01".to_string(),
                    speaker: "Dana".to_string(),
                    text: "the alpha recording".to_string(),
                },
                TranscriptRow {
                    index: 1,
                    timestamp: "00:07".to_string(),
                    speaker: "Robin".to_string(),
                    text: "continues here".to_string(),
                },
            ])
        }
    }

    fn write_catalog(dir: &Path) {
        let catalog = r#"[
            {"name": "Alpha Review", "url": "https://example.org/stream.aspx?id=alpha"},
            {"name": "Beta Review", "url": "https://example.org/stream.aspx?id=beta"}
        ]"#;
        fs::write(dir.join("links.json"), catalog).unwrap();
    }

    #[test]
    fn scrape_run_isolates_login_timeouts_per_link() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let store = seeded_store(&settings);
        write_catalog(&store.stage_dir(Stage::RawLink));

        let source = ScriptedRunSource {
            current: String::new(),
        };
        let summary = RunProcessor::new(settings.clone())
            .with_transcript_source(Box::new(source))
            .run(RunMode::Auto)
            .unwrap();

        assert_eq!(summary.pipeline, PipelineKind::SharePoint);
        assert_eq!(summary.failures_by_kind().get("login-timeout"), Some(&1));

        let store = seeded_store(&settings);
        assert!(store.has_output(Stage::Json, "Alpha_Review"));
        assert!(!store.has_output(Stage::Json, "Beta_Review"));
        assert!(store.has_output(Stage::Transcript, "Alpha_Review"));
        let body = fs::read_to_string(
            store.stage_dir(Stage::Transcript).join("Alpha_Review.md"),
        )
        .unwrap();
        assert!(body.contains("the alpha recording"));
    }

    #[test]
    fn html_only_run_distills_saved_pages() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        let store = seeded_store(&settings);
        fs::write(
            store.stage_dir(Stage::Html).join("notes.html"),
            article_page("page material"),
        )
        .unwrap();

        let summary = RunProcessor::new(settings.clone())
            .run(RunMode::Auto)
            .unwrap();

        assert_eq!(summary.pipeline, PipelineKind::HtmlOnly);
        assert_eq!(summary.completed_count(), 1);

        let store = seeded_store(&settings);
        let body =
            fs::read_to_string(store.stage_dir(Stage::Transcript).join("notes.md")).unwrap();
        assert!(body.contains("page material"));
    }

    #[test]
    fn empty_store_is_refused() {
        let tmp = TempDir::new().unwrap();
        let settings = test_settings(tmp.path());
        seeded_store(&settings);

        let err = RunProcessor::new(settings).run(RunMode::Auto).unwrap_err();
        assert!(matches!(err, RunError::NoInput(_)));
    }
}
