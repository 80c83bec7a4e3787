//! Segment metadata sidecars.
//!
//! Splitting one source into segments writes `<logical>.meta.json` next to
//! the segment files, after all of them. Its presence is the commit record
//! for the split: a rerun that finds the sidecar skips the whole split.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation failures for a segment sidecar.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("no segments listed for '{0}'")]
    Empty(String),
    #[error("segment count {declared} does not match the {actual} listed indices")]
    CountMismatch { declared: usize, actual: usize },
    #[error("segment indices must start at 0, found {0}")]
    BadStart(usize),
    #[error("segment indices must be gapless and increasing, expected {expected} found {found}")]
    Gap { expected: usize, found: usize },
}

/// Sidecar describing the segments produced from one source artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMetadata {
    /// Logical name of the source the segments came from.
    pub source: String,
    /// Declared language tag, carried through untouched to assembly.
    pub language: String,
    /// Ordered segment indices, 0-based and gapless.
    pub segments: Vec<usize>,
    pub segment_count: usize,
}

impl SegmentMetadata {
    /// Build a sidecar for `count` segments of one source.
    pub fn new(source: impl Into<String>, language: impl Into<String>, count: usize) -> Self {
        Self {
            source: source.into(),
            language: language.into(),
            segments: (0..count).collect(),
            segment_count: count,
        }
    }

    /// Check the index list: non-empty, counted, 0-based, gapless.
    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.segments.is_empty() {
            return Err(MetadataError::Empty(self.source.clone()));
        }
        if self.segments.len() != self.segment_count {
            return Err(MetadataError::CountMismatch {
                declared: self.segment_count,
                actual: self.segments.len(),
            });
        }
        if self.segments[0] != 0 {
            return Err(MetadataError::BadStart(self.segments[0]));
        }
        for (expected, found) in self.segments.iter().copied().enumerate() {
            if found != expected {
                return Err(MetadataError::Gap { expected, found });
            }
        }
        Ok(())
    }

    /// Sidecar file name for a logical name.
    pub fn file_name(logical: &str) -> String {
        format!("{logical}.meta.json")
    }

    /// Write the sidecar into a stage directory (atomic temp + rename).
    pub fn save_to(&self, stage_dir: &Path) -> Result<(), std::io::Error> {
        let path = stage_dir.join(Self::file_name(&self.source));
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &json)?;
        fs::rename(&temp_path, &path)?;

        tracing::debug!(
            "Saved segment metadata for '{}' to {}",
            self.source,
            path.display()
        );
        Ok(())
    }

    /// Load the sidecar for a logical name, `None` when absent.
    pub fn load_from(stage_dir: &Path, logical: &str) -> Result<Option<Self>, std::io::Error> {
        let path = stage_dir.join(Self::file_name(logical));
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let meta: Self = serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        Ok(Some(meta))
    }

    /// Path the sidecar would live at inside a stage directory.
    pub fn path_in(stage_dir: &Path, logical: &str) -> PathBuf {
        stage_dir.join(Self::file_name(logical))
    }
}

/// Segment file name: `<logical>_part<index>.<ext>` with a three-digit index.
pub fn segment_file_name(logical: &str, index: usize, ext: &str) -> String {
    format!("{logical}_part{index:03}.{ext}")
}

/// Split a segment stem back into its source logical name and index.
///
/// Returns `None` for stems that do not follow the `_part<NNN>` scheme.
pub fn parse_segment_stem(stem: &str) -> Option<(&str, usize)> {
    let at = stem.rfind("_part")?;
    let (source, rest) = stem.split_at(at);
    let digits = &rest["_part".len()..];
    if source.is_empty() || digits.len() < 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index = digits.parse().ok()?;
    Some((source, index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_metadata_validates() {
        let meta = SegmentMetadata::new("clip", "en", 3);
        assert_eq!(meta.segments, vec![0, 1, 2]);
        assert!(meta.validate().is_ok());
    }

    #[test]
    fn validate_rejects_gap() {
        let meta = SegmentMetadata {
            source: "clip".into(),
            language: "en".into(),
            segments: vec![0, 2, 3],
            segment_count: 3,
        };
        assert_eq!(
            meta.validate(),
            Err(MetadataError::Gap {
                expected: 1,
                found: 2
            })
        );
    }

    #[test]
    fn validate_rejects_duplicate() {
        let meta = SegmentMetadata {
            source: "clip".into(),
            language: "en".into(),
            segments: vec![0, 1, 1],
            segment_count: 3,
        };
        assert!(meta.validate().is_err());
    }

    #[test]
    fn validate_rejects_count_mismatch() {
        let meta = SegmentMetadata {
            source: "clip".into(),
            language: "en".into(),
            segments: vec![0, 1],
            segment_count: 3,
        };
        assert_eq!(
            meta.validate(),
            Err(MetadataError::CountMismatch {
                declared: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn validate_rejects_nonzero_start() {
        let meta = SegmentMetadata {
            source: "clip".into(),
            language: "en".into(),
            segments: vec![1, 2],
            segment_count: 2,
        };
        assert_eq!(meta.validate(), Err(MetadataError::BadStart(1)));
    }

    #[test]
    fn save_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let meta = SegmentMetadata::new("talk", "de", 2);
        meta.save_to(temp_dir.path()).unwrap();

        let loaded = SegmentMetadata::load_from(temp_dir.path(), "talk")
            .unwrap()
            .unwrap();
        assert_eq!(loaded, meta);
    }

    #[test]
    fn load_missing_returns_none() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = SegmentMetadata::load_from(temp_dir.path(), "absent").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn segment_names_round_trip() {
        let name = segment_file_name("clip", 7, "wav");
        assert_eq!(name, "clip_part007.wav");
        assert_eq!(parse_segment_stem("clip_part007"), Some(("clip", 7)));
    }

    #[test]
    fn parse_rejects_foreign_stems() {
        assert_eq!(parse_segment_stem("clip"), None);
        assert_eq!(parse_segment_stem("clip_part7"), None);
        assert_eq!(parse_segment_stem("_part007"), None);
    }

    #[test]
    fn parse_handles_source_containing_part() {
        assert_eq!(
            parse_segment_stem("two_part_story_part012"),
            Some(("two_part_story", 12))
        );
    }
}
