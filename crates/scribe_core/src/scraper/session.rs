//! Session controller: drives one browser through a list of links.
//!
//! Links are processed strictly one after another; a shared profile
//! directory keeps the login alive, so a single interactive sign-in
//! covers the whole session. One link failing never stops the rest.

use std::thread;
use std::time::{Duration, Instant};

use crate::config::ScraperSettings;
use crate::models::{ScrapedTranscript, SessionPhase, Stage};
use crate::scraper::source::{PageProbe, ScrapeError, ScrapeResult, TranscriptSource};
use crate::store::StageStore;

/// How one link ended.
#[derive(Debug)]
pub enum LinkOutcome {
    /// Transcript JSON written with this many rows.
    Saved { rows: usize },
    /// Output already existed and overwrite was off.
    Skipped,
    /// The link failed; later links still ran.
    Failed(ScrapeError),
}

/// Per-link record of a scraping session.
#[derive(Debug)]
pub struct LinkReport {
    pub name: String,
    pub url: String,
    pub outcome: LinkOutcome,
}

impl LinkReport {
    pub fn succeeded(&self) -> bool {
        !matches!(self.outcome, LinkOutcome::Failed(_))
    }
}

/// Walks each link through the session phases.
pub struct SessionController<S: TranscriptSource> {
    source: S,
    settings: ScraperSettings,
    phase: SessionPhase,
}

impl<S: TranscriptSource> SessionController<S> {
    pub fn new(source: S, settings: ScraperSettings) -> Self {
        Self {
            source,
            settings,
            phase: SessionPhase::Idle,
        }
    }

    /// Phase of the link currently being processed.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Fetch one link's transcript.
    ///
    /// Navigates, opens the transcript panel when it is collapsed,
    /// waits for rows to appear (giving a human time to log in), then
    /// scrolls the whole transcript.
    pub fn fetch(&mut self, name: &str, url: &str) -> ScrapeResult<ScrapedTranscript> {
        self.phase = SessionPhase::Navigating;
        tracing::info!("{}: opening {}", name, url);
        if let Err(e) = self.source.open(url) {
            self.phase = SessionPhase::Failed;
            return Err(e);
        }

        match self.source.try_open_panel() {
            Ok(true) => tracing::debug!("{}: opened transcript panel", name),
            Ok(false) => {}
            Err(e) => {
                self.phase = SessionPhase::Failed;
                return Err(e);
            }
        }

        if let Err(e) = self.await_transcript(name) {
            self.phase = SessionPhase::Failed;
            return Err(e);
        }

        self.phase = SessionPhase::Extracting;
        tracing::info!("{}: collecting transcript rows", name);
        let rows = match self.source.collect_rows() {
            Ok(rows) => rows,
            Err(e) => {
                self.phase = SessionPhase::Failed;
                return Err(e);
            }
        };

        if rows.is_empty() {
            self.phase = SessionPhase::Failed;
            return Err(ScrapeError::NoRows);
        }

        Ok(ScrapedTranscript {
            name: name.to_string(),
            url: url.to_string(),
            rows,
        })
    }

    /// Process every link, writing each transcript into the JSON stage.
    ///
    /// Existing outputs are skipped unless `overwrite` is set. Failures
    /// are recorded per link and never abort the session.
    pub fn run_catalog(
        &mut self,
        links: &[crate::catalog::LinkEntry],
        store: &StageStore,
        overwrite: bool,
    ) -> Vec<LinkReport> {
        let mut reports = Vec::with_capacity(links.len());

        for link in links {
            if !overwrite && store.has_output(Stage::Json, &link.name) {
                tracing::info!("{}: transcript json exists, skipping", link.name);
                reports.push(LinkReport {
                    name: link.name.clone(),
                    url: link.url.clone(),
                    outcome: LinkOutcome::Skipped,
                });
                continue;
            }

            let outcome = match self.fetch(&link.name, &link.url) {
                Ok(transcript) => {
                    let file_name = format!("{}.json", link.name);
                    match store.write_json(Stage::Json, &file_name, &transcript) {
                        Ok(path) => {
                            self.phase = SessionPhase::Saved;
                            tracing::info!(
                                "{}: saved {} row(s) to {}",
                                link.name,
                                transcript.rows.len(),
                                path.display()
                            );
                            LinkOutcome::Saved {
                                rows: transcript.rows.len(),
                            }
                        }
                        Err(e) => {
                            self.phase = SessionPhase::Failed;
                            LinkOutcome::Failed(ScrapeError::Persist(e))
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("{}: scrape failed: {}", link.name, e);
                    LinkOutcome::Failed(e)
                }
            };

            reports.push(LinkReport {
                name: link.name.clone(),
                url: link.url.clone(),
                outcome,
            });
        }

        reports
    }

    /// Wait until transcript rows are present.
    ///
    /// A login wall is not an error; it just means a human has to sign
    /// in before the deadline. The deadline applies regardless of what
    /// the page shows.
    fn await_transcript(&mut self, name: &str) -> ScrapeResult<()> {
        let deadline = Instant::now() + Duration::from_secs(self.settings.login_timeout_secs);
        let pause = Duration::from_millis(self.settings.poll_interval_ms.max(1));

        // The first probe decides the path: content already reachable,
        // or an auth surface somebody has to click through.
        let mut announced = false;
        match self.source.probe()? {
            PageProbe::TranscriptReady => return Ok(()),
            PageProbe::LoginWall => {
                self.phase = SessionPhase::LoginRequired;
                tracing::info!(
                    "{}: login required, waiting up to {}s for sign-in",
                    name,
                    self.settings.login_timeout_secs
                );
                announced = true;
            }
            PageProbe::Pending => {}
        }

        self.phase = SessionPhase::AwaitingLogin;
        loop {
            if Instant::now() >= deadline {
                return Err(ScrapeError::LoginTimeout(self.settings.login_timeout_secs));
            }
            thread::sleep(pause);

            match self.source.probe()? {
                PageProbe::TranscriptReady => return Ok(()),
                PageProbe::LoginWall => {
                    if !announced {
                        tracing::info!(
                            "{}: login required, waiting up to {}s for sign-in",
                            name,
                            self.settings.login_timeout_secs
                        );
                        announced = true;
                    }
                }
                PageProbe::Pending => {}
            }
        }
    }
}
