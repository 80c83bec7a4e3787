//! Format router: decides which pipeline a store runs.

use crate::models::{PipelineKind, RunMode, Stage};
use crate::store::StageStore;

use super::errors::{RunError, RunResult};

/// Occupancy snapshot of the rank-1 and rank-3 stages, taken from the
/// store index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSnapshot {
    pub catalogs: usize,
    pub raw_audio: usize,
    pub raw_video: usize,
    pub html: usize,
    pub json: usize,
}

impl StageSnapshot {
    /// Capture the current counts.
    pub fn capture(store: &StageStore) -> Self {
        Self {
            catalogs: store.count(Stage::RawLink),
            raw_audio: store.count(Stage::RawAudio),
            raw_video: store.count(Stage::RawVideo),
            html: store.count(Stage::Html),
            json: store.count(Stage::Json),
        }
    }

    fn has_raw_media(&self) -> bool {
        self.raw_audio > 0 || self.raw_video > 0
    }
}

/// Pick the pipeline for this run.
///
/// A forced mode bypasses detection but still requires its inputs to
/// exist. Under auto detection the order is: link catalogs, then pages
/// without raw media, then raw media. Raw video routes through the
/// audio pipeline (the track gets extracted first); audio-only input
/// runs the video pipeline only when forced.
pub fn select_pipeline(snapshot: &StageSnapshot, mode: RunMode) -> RunResult<PipelineKind> {
    if let Some(forced) = mode.forced_pipeline() {
        let available = match forced {
            PipelineKind::SharePoint => snapshot.catalogs > 0 || snapshot.json > 0,
            PipelineKind::HtmlOnly => snapshot.html > 0,
            PipelineKind::AudioBased | PipelineKind::VideoBased => snapshot.has_raw_media(),
        };
        if !available {
            return Err(RunError::no_input(format!(
                "mode {mode} needs inputs that are not present"
            )));
        }
        return Ok(forced);
    }

    if snapshot.catalogs > 0 || snapshot.json > 0 {
        return Ok(PipelineKind::SharePoint);
    }
    if snapshot.html > 0 && !snapshot.has_raw_media() {
        return Ok(PipelineKind::HtmlOnly);
    }
    if snapshot.has_raw_media() {
        return Ok(PipelineKind::AudioBased);
    }

    Err(RunError::no_input(
        "no raw media, pages or link catalogs in the store",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(catalogs: usize, audio: usize, video: usize, html: usize, json: usize) -> StageSnapshot {
        StageSnapshot {
            catalogs,
            raw_audio: audio,
            raw_video: video,
            html,
            json,
        }
    }

    #[test]
    fn catalogs_win_over_everything() {
        let snap = snapshot(1, 2, 2, 2, 0);
        assert_eq!(
            select_pipeline(&snap, RunMode::Auto).unwrap(),
            PipelineKind::SharePoint
        );
    }

    #[test]
    fn leftover_json_resumes_the_sharepoint_tail() {
        let snap = snapshot(0, 0, 0, 0, 3);
        assert_eq!(
            select_pipeline(&snap, RunMode::Auto).unwrap(),
            PipelineKind::SharePoint
        );
    }

    #[test]
    fn html_without_raw_media_is_html_only() {
        let snap = snapshot(0, 0, 0, 4, 0);
        assert_eq!(
            select_pipeline(&snap, RunMode::Auto).unwrap(),
            PipelineKind::HtmlOnly
        );
    }

    #[test]
    fn raw_media_beats_html_pages() {
        let snap = snapshot(0, 1, 0, 4, 0);
        assert_eq!(
            select_pipeline(&snap, RunMode::Auto).unwrap(),
            PipelineKind::AudioBased
        );
    }

    #[test]
    fn video_routes_through_the_audio_pipeline() {
        let snap = snapshot(0, 0, 3, 0, 0);
        assert_eq!(
            select_pipeline(&snap, RunMode::Auto).unwrap(),
            PipelineKind::AudioBased
        );
    }

    #[test]
    fn video_pipeline_only_when_forced() {
        let snap = snapshot(0, 2, 0, 0, 0);
        assert_eq!(
            select_pipeline(&snap, RunMode::Auto).unwrap(),
            PipelineKind::AudioBased
        );
        assert_eq!(
            select_pipeline(&snap, RunMode::Video).unwrap(),
            PipelineKind::VideoBased
        );
    }

    #[test]
    fn forced_mode_still_needs_inputs() {
        let snap = snapshot(0, 0, 0, 0, 0);
        assert!(matches!(
            select_pipeline(&snap, RunMode::SharePoint),
            Err(RunError::NoInput(_))
        ));
        assert!(matches!(
            select_pipeline(&snap, RunMode::Auto),
            Err(RunError::NoInput(_))
        ));
    }
}
