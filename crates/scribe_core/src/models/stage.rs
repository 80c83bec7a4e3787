//! The named stage folders a pipeline run moves artifacts through.

use serde::{Deserialize, Serialize};

use super::enums::MediaKind;

/// One stage folder of the store.
///
/// Directory names are authoritative and never localized; ranks give the
/// advancement order raw input moves through on its way to a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "RawAUDIO")]
    RawAudio,
    #[serde(rename = "RawVIDEO")]
    RawVideo,
    #[serde(rename = "RawLINK")]
    RawLink,
    #[serde(rename = "SplittedAUDIO")]
    SplittedAudio,
    #[serde(rename = "SplittedVIDEO")]
    SplittedVideo,
    /// Auxiliary refinement of split audio; consumers fall back to
    /// `SplittedAudio` when it is absent.
    #[serde(rename = "EnhancedAUDIO")]
    EnhancedAudio,
    #[serde(rename = "HTML")]
    Html,
    #[serde(rename = "JSON")]
    Json,
    #[serde(rename = "Transcript")]
    Transcript,
}

impl Stage {
    /// Directory name under the store root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Stage::RawAudio => "RawAUDIO",
            Stage::RawVideo => "RawVIDEO",
            Stage::RawLink => "RawLINK",
            Stage::SplittedAudio => "SplittedAUDIO",
            Stage::SplittedVideo => "SplittedVIDEO",
            Stage::EnhancedAudio => "EnhancedAUDIO",
            Stage::Html => "HTML",
            Stage::Json => "JSON",
            Stage::Transcript => "Transcript",
        }
    }

    /// Advancement rank. Raw input is 1, the final transcript is 4.
    pub fn rank(&self) -> u8 {
        match self {
            Stage::RawAudio | Stage::RawVideo | Stage::RawLink => 1,
            Stage::SplittedAudio | Stage::SplittedVideo | Stage::EnhancedAudio => 2,
            Stage::Html | Stage::Json => 3,
            Stage::Transcript => 4,
        }
    }

    /// The single artifact kind this stage holds.
    pub fn expected_kind(&self) -> MediaKind {
        match self {
            Stage::RawAudio | Stage::SplittedAudio | Stage::EnhancedAudio => MediaKind::Audio,
            Stage::RawVideo | Stage::SplittedVideo => MediaKind::Video,
            Stage::RawLink => MediaKind::Catalog,
            Stage::Html => MediaKind::Html,
            Stage::Json => MediaKind::Json,
            Stage::Transcript => MediaKind::Transcript,
        }
    }

    /// Whether this stage holds caller-provided input rather than
    /// pipeline-produced output.
    pub fn is_raw(&self) -> bool {
        self.rank() == 1
    }

    /// Look a stage up by its directory name.
    pub fn from_dir_name(name: &str) -> Option<Stage> {
        Self::all().iter().copied().find(|s| s.dir_name() == name)
    }

    /// All stages, raw first, transcript last.
    pub fn all() -> &'static [Stage] {
        &[
            Stage::RawAudio,
            Stage::RawVideo,
            Stage::RawLink,
            Stage::SplittedAudio,
            Stage::SplittedVideo,
            Stage::EnhancedAudio,
            Stage::Html,
            Stage::Json,
            Stage::Transcript,
        ]
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_names_round_trip() {
        for stage in Stage::all() {
            assert_eq!(Stage::from_dir_name(stage.dir_name()), Some(*stage));
        }
    }

    #[test]
    fn ranks_are_monotonic_along_all() {
        let ranks: Vec<u8> = Stage::all().iter().map(|s| s.rank()).collect();
        let mut sorted = ranks.clone();
        sorted.sort_unstable();
        assert_eq!(ranks, sorted);
    }

    #[test]
    fn serializes_as_directory_name() {
        let json = serde_json::to_string(&Stage::SplittedAudio).unwrap();
        assert_eq!(json, "\"SplittedAUDIO\"");
    }

    #[test]
    fn raw_stages_are_rank_one() {
        assert!(Stage::RawLink.is_raw());
        assert!(!Stage::Json.is_raw());
    }
}
