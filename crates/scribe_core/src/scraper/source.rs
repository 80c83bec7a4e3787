//! Trait seam between the session controller and the browser.

use thiserror::Error;

use crate::models::TranscriptRow;

/// Error type for scraping operations.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Browser could not be launched.
    #[error("could not launch browser: {0}")]
    Launch(String),

    /// A browser interaction failed.
    #[error("browser failure: {0}")]
    Browser(#[from] anyhow::Error),

    /// Nobody finished logging in before the deadline.
    #[error("login not completed within {0} seconds")]
    LoginTimeout(u64),

    /// The transcript page produced no rows at all.
    #[error("transcript page yielded no rows")]
    NoRows,

    /// In-page script returned something unexpected.
    #[error("unexpected page payload: {0}")]
    BadPayload(String),

    /// Collected transcript could not be written out.
    #[error("could not persist transcript: {0}")]
    Persist(#[from] std::io::Error),
}

/// Result type for scraping operations.
pub type ScrapeResult<T> = Result<T, ScrapeError>;

/// What the current page looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageProbe {
    /// Transcript rows are present in the DOM.
    TranscriptReady,
    /// A credential form is visible; a human has to act.
    LoginWall,
    /// Neither rows nor a login form yet.
    Pending,
}

/// A page that can be navigated to and mined for transcript rows.
///
/// The production implementation drives a Chrome tab; tests use
/// scripted fakes.
pub trait TranscriptSource {
    /// Navigate to `url` and wait for the initial document load.
    fn open(&mut self, url: &str) -> ScrapeResult<()>;

    /// Click the transcript panel control when present. Returns
    /// whether anything was clicked.
    fn try_open_panel(&mut self) -> ScrapeResult<bool>;

    /// Inspect the current page state.
    fn probe(&mut self) -> ScrapeResult<PageProbe>;

    /// Scroll through the transcript and collect every row, ordered
    /// by row index.
    fn collect_rows(&mut self) -> ScrapeResult<Vec<TranscriptRow>>;
}

impl<T: TranscriptSource + ?Sized> TranscriptSource for Box<T> {
    fn open(&mut self, url: &str) -> ScrapeResult<()> {
        (**self).open(url)
    }

    fn try_open_panel(&mut self) -> ScrapeResult<bool> {
        (**self).try_open_panel()
    }

    fn probe(&mut self) -> ScrapeResult<PageProbe> {
        (**self).probe()
    }

    fn collect_rows(&mut self) -> ScrapeResult<Vec<TranscriptRow>> {
        (**self).collect_rows()
    }
}
