//! Chrome-backed transcript source.
//!
//! Drives a real browser over the DevTools protocol. The stream player
//! renders transcript rows as `div[id^='sub-entry-']` elements inside a
//! virtualized list, so rows are harvested incrementally while
//! scrolling and deduplicated by row index.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use headless_chrome::{Browser, LaunchOptionsBuilder, Tab};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ScraperSettings;
use crate::models::TranscriptRow;
use crate::scraper::source::{PageProbe, ScrapeError, ScrapeResult, TranscriptSource};

/// Pause after navigation before touching the page; the player builds
/// its DOM well after the document load event.
const NAVIGATION_SETTLE: Duration = Duration::from_secs(3);

/// Harvest all currently rendered transcript rows.
const ROWS_JS: &str = r##"
(() => {
    const rows = Array.from(document.querySelectorAll("div[id^='sub-entry-']"));
    const out = [];
    for (const el of rows) {
        const m = el.id.match(/(\d+)\s*$/);
        if (!m) continue;
        const idx = parseInt(m[1], 10);
        const text = (el.textContent || "").trim();
        if (!text) continue;
        let speaker = "";
        const header = document.querySelector("#itemHeader-" + idx + " span.itemDisplayName-507");
        if (header) speaker = (header.textContent || "").trim();
        if (!speaker) {
            const ev = el.querySelector("p.eventSpeakerName-501");
            if (ev) speaker = (ev.textContent || "").trim();
        }
        let timestamp = "";
        const ts = document.querySelector("#Header-timestamp-" + idx);
        if (ts) timestamp = (ts.textContent || "").trim();
        out.push({ index: idx, timestamp: timestamp, speaker: speaker, text: text });
    }
    return JSON.stringify(out);
})()
"##;

/// Row count plus whether a credential form is on screen.
const PROBE_JS: &str = r##"
(() => {
    return JSON.stringify({
        rows: document.querySelectorAll("div[id^='sub-entry-']").length,
        login: !!(document.querySelector("input[type='password']")
            || document.querySelector("#loginHeader"))
    });
})()
"##;

/// Click the transcript panel toggle when the rows are not yet in the
/// DOM. Label matching covers the English and Italian UI.
const OPEN_PANEL_JS: &str = r##"
(() => {
    if (document.querySelector("div[id^='sub-entry-']")) return false;
    const labels = ["Transcript", "Trascrizione"];
    const nodes = Array.from(document.querySelectorAll("button, a"));
    for (const n of nodes) {
        const t = (n.textContent || "").trim();
        for (const label of labels) {
            if (t.indexOf(label) !== -1) { n.click(); return true; }
        }
    }
    return false;
})()
"##;

/// Scroll the transcript list one step. Walks up from the first row to
/// find the scrollable ancestor; falls back to scrolling the window.
const SCROLL_JS: &str = r##"
(() => {
    const row = document.querySelector("div[id^='sub-entry-']");
    let el = row ? row.parentElement : null;
    for (let i = 0; el && i < 35; i++) {
        const style = window.getComputedStyle(el);
        const oy = style.overflowY;
        if ((oy === "auto" || oy === "scroll") && el.scrollHeight > el.clientHeight + 5) {
            el.scrollTop = el.scrollTop + Math.max(80, Math.floor(el.clientHeight * 0.75));
            return true;
        }
        el = el.parentElement;
    }
    window.scrollBy(0, Math.floor(window.innerHeight * 0.75));
    return false;
})()
"##;

#[derive(Debug, Deserialize)]
struct ProbeState {
    rows: usize,
    login: bool,
}

/// Transcript source backed by a headless (or headed) Chrome tab.
///
/// The browser stays alive for the whole session so one login covers
/// every link.
pub struct ChromeSource {
    // Dropping the browser closes the Chrome process; keep it around
    // for the lifetime of the tab.
    _browser: Browser,
    tab: Arc<Tab>,
    pause: Duration,
    scroll_max: Duration,
    stable_rounds: u32,
}

impl ChromeSource {
    /// Launch Chrome with a persistent profile.
    pub fn launch(settings: &ScraperSettings, profile_dir: &Path) -> ScrapeResult<Self> {
        std::fs::create_dir_all(profile_dir)
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;

        let options = LaunchOptionsBuilder::default()
            .headless(settings.headless)
            .sandbox(false)
            .window_size(Some((1400, 1000)))
            .user_data_dir(Some(profile_dir.to_path_buf()))
            // The connection must survive a human taking their time on
            // the login page.
            .idle_browser_timeout(Duration::from_secs(settings.login_timeout_secs + 120))
            .build()
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;

        let browser = Browser::new(options)?;
        let tab = browser.new_tab()?;

        tracing::info!(
            "Browser ready (headless={}, profile={})",
            settings.headless,
            profile_dir.display()
        );

        Ok(Self {
            _browser: browser,
            tab,
            pause: Duration::from_millis(settings.poll_interval_ms.max(1)),
            scroll_max: Duration::from_secs(settings.scroll_max_secs),
            stable_rounds: settings.scroll_stable_rounds.max(1),
        })
    }

    /// Evaluate a script that returns a JSON string.
    fn eval_json<T: DeserializeOwned>(&self, js: &str) -> ScrapeResult<T> {
        let object = self.tab.evaluate(js, false)?;
        let value = object
            .value
            .ok_or_else(|| ScrapeError::BadPayload("script returned no value".to_string()))?;
        let text = value
            .as_str()
            .ok_or_else(|| ScrapeError::BadPayload(format!("expected string, got {value}")))?;
        serde_json::from_str(text).map_err(|e| ScrapeError::BadPayload(e.to_string()))
    }

    /// Evaluate a script that returns a boolean.
    fn eval_bool(&self, js: &str) -> ScrapeResult<bool> {
        let object = self.tab.evaluate(js, false)?;
        Ok(object.value.and_then(|v| v.as_bool()).unwrap_or(false))
    }
}

impl TranscriptSource for ChromeSource {
    fn open(&mut self, url: &str) -> ScrapeResult<()> {
        self.tab.navigate_to(url)?;
        self.tab.wait_until_navigated()?;
        thread::sleep(NAVIGATION_SETTLE);
        Ok(())
    }

    fn try_open_panel(&mut self) -> ScrapeResult<bool> {
        self.eval_bool(OPEN_PANEL_JS)
    }

    fn probe(&mut self) -> ScrapeResult<PageProbe> {
        let state: ProbeState = self.eval_json(PROBE_JS)?;
        if state.rows > 0 {
            Ok(PageProbe::TranscriptReady)
        } else if state.login {
            Ok(PageProbe::LoginWall)
        } else {
            Ok(PageProbe::Pending)
        }
    }

    fn collect_rows(&mut self) -> ScrapeResult<Vec<TranscriptRow>> {
        let deadline = Instant::now() + self.scroll_max;
        let mut seen: BTreeMap<usize, TranscriptRow> = BTreeMap::new();
        let mut stable: u32 = 0;
        let mut round: u64 = 0;

        loop {
            let batch: Vec<TranscriptRow> = self.eval_json(ROWS_JS)?;
            let before = seen.len();
            for row in batch {
                seen.entry(row.index).or_insert(row);
            }

            if seen.len() == before {
                stable += 1;
            } else {
                stable = 0;
            }

            if stable >= self.stable_rounds {
                break;
            }
            if Instant::now() >= deadline {
                tracing::warn!(
                    "Scroll cap reached with {} row(s) collected; taking what we have",
                    seen.len()
                );
                break;
            }

            if round % 20 == 0 {
                tracing::debug!("Scrolling: rows={} stable={}", seen.len(), stable);
            }
            round += 1;

            self.eval_bool(SCROLL_JS)?;
            thread::sleep(self.pause);
        }

        Ok(seen.into_values().collect())
    }
}
