//! Artifact handle: one file in one stage folder.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::enums::MediaKind;
use super::stage::Stage;

/// A single file tracked by the store.
///
/// The logical name is the file stem and stays stable while the artifact
/// advances through stages; only the extension and directory change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaArtifact {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// File stem, the identity carried across stages.
    pub logical_name: String,
    pub kind: MediaKind,
    pub stage: Stage,
}

impl MediaArtifact {
    /// Create an artifact handle.
    pub fn new(
        path: impl Into<PathBuf>,
        logical_name: impl Into<String>,
        kind: MediaKind,
        stage: Stage,
    ) -> Self {
        Self {
            path: path.into(),
            logical_name: logical_name.into(),
            kind,
            stage,
        }
    }

    /// Build an artifact from a file found inside a stage folder.
    ///
    /// Returns `None` when the extension does not match the stage's kind,
    /// so stray files are ignored rather than misclassified.
    pub fn from_stage_file(path: &Path, stage: Stage) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        let kind = stage.expected_kind();
        if !kind.matches_extension(ext) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        Some(Self::new(path, stem, kind, stage))
    }

    /// File name including extension.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.logical_name)
    }
}

impl std::fmt::Display for MediaArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.stage, self.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_stage_file_accepts_matching_extension() {
        let artifact =
            MediaArtifact::from_stage_file(Path::new("/store/RawAUDIO/clip.wav"), Stage::RawAudio)
                .unwrap();
        assert_eq!(artifact.logical_name, "clip");
        assert_eq!(artifact.kind, MediaKind::Audio);
        assert_eq!(artifact.stage, Stage::RawAudio);
    }

    #[test]
    fn from_stage_file_rejects_foreign_extension() {
        let artifact =
            MediaArtifact::from_stage_file(Path::new("/store/RawAUDIO/notes.txt"), Stage::RawAudio);
        assert!(artifact.is_none());
    }

    #[test]
    fn display_shows_stage_and_file() {
        let artifact = MediaArtifact::new(
            "/store/HTML/talk_part001.html",
            "talk_part001",
            MediaKind::Html,
            Stage::Html,
        );
        assert_eq!(artifact.to_string(), "HTML/talk_part001.html");
    }
}
