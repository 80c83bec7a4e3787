//! Data models for the transcript pipeline.
//!
//! This module contains the core data structures used throughout the crate:
//! - Enums for artifact kinds, pipelines, run modes and session phases
//! - Stage folders (names, ranks, expected kinds)
//! - Artifacts, segment metadata sidecars and transcript records

mod artifact;
mod enums;
mod metadata;
mod stage;
mod transcript;

// Re-export all public types
pub use artifact::MediaArtifact;
pub use enums::{AssemblyPolicy, MediaKind, PipelineKind, RunMode, SessionPhase};
pub use metadata::{parse_segment_stem, segment_file_name, MetadataError, SegmentMetadata};
pub use stage::Stage;
pub use transcript::{Fragment, ScrapedTranscript, TranscriptRecord, TranscriptRow};
