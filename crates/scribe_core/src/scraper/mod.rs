//! Browser-driven transcript scraping.
//!
//! A [`SessionController`] walks each catalog link through a phase
//! sequence (navigate, wait for login, extract, save) against a
//! [`TranscriptSource`]. The production source drives Chrome; tests
//! script fakes against the same trait.

mod browser;
mod session;
mod source;

pub use browser::ChromeSource;
pub use session::{LinkOutcome, LinkReport, SessionController};
pub use source::{PageProbe, ScrapeError, ScrapeResult, TranscriptSource};
