//! Core enums used throughout the pipeline.

use serde::{Deserialize, Serialize};

/// Kind of artifact a stage folder holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
    Html,
    /// Scraped transcript rows, one JSON file per link.
    Json,
    /// Link catalog file (name/url collection).
    Catalog,
    Transcript,
}

impl MediaKind {
    /// File extensions accepted for this kind (lowercase, no dot).
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            MediaKind::Audio => &["wav", "mp3", "m4a", "aac", "flac", "ogg", "opus"],
            MediaKind::Video => &["mp4", "mkv", "mov", "avi", "webm", "m4v", "ts"],
            MediaKind::Html => &["html", "htm"],
            MediaKind::Json => &["json"],
            MediaKind::Catalog => &["json"],
            MediaKind::Transcript => &["md"],
        }
    }

    /// Check whether a file extension belongs to this kind.
    pub fn matches_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.extensions().iter().any(|e| *e == ext)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Html => write!(f, "html"),
            MediaKind::Json => write!(f, "json"),
            MediaKind::Catalog => write!(f, "catalog"),
            MediaKind::Transcript => write!(f, "transcript"),
        }
    }
}

/// Which of the four processing pipelines a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    /// Media in, audio segments out: convert, split, enhance, transcribe.
    AudioBased,
    /// Media in, video segments out: convert, split, transcribe.
    VideoBased,
    /// HTML documents already present, only extraction and assembly run.
    HtmlOnly,
    /// Link catalog in, scraping session produces the row JSON.
    SharePoint,
}

impl PipelineKind {
    /// Get the display name for this pipeline.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AudioBased => "Audio-Based",
            Self::VideoBased => "Video-Based",
            Self::HtmlOnly => "HTML-Only",
            Self::SharePoint => "SharePoint",
        }
    }

    /// Get all pipelines as a list.
    pub fn all() -> &'static [PipelineKind] {
        &[
            Self::AudioBased,
            Self::VideoBased,
            Self::HtmlOnly,
            Self::SharePoint,
        ]
    }
}

impl std::fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Run mode requested on the command line.
///
/// `Auto` lets the router inspect stage occupancy; the other modes force
/// a specific pipeline and only validate that its inputs exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Auto,
    Audio,
    Video,
    Html,
    SharePoint,
}

impl RunMode {
    /// Get the display name for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Html => "html",
            Self::SharePoint => "sharepoint",
        }
    }

    /// Pipeline this mode forces, or `None` for auto-detection.
    pub fn forced_pipeline(&self) -> Option<PipelineKind> {
        match self {
            Self::Auto => None,
            Self::Audio => Some(PipelineKind::AudioBased),
            Self::Video => Some(PipelineKind::VideoBased),
            Self::Html => Some(PipelineKind::HtmlOnly),
            Self::SharePoint => Some(PipelineKind::SharePoint),
        }
    }

    /// Get all modes as a list.
    pub fn all() -> &'static [RunMode] {
        &[
            Self::Auto,
            Self::Audio,
            Self::Video,
            Self::Html,
            Self::SharePoint,
        ]
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How the assembler treats missing fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssemblyPolicy {
    /// Any missing fragment fails the whole transcript.
    #[default]
    Strict,
    /// Missing fragments become explicit gap markers in the output.
    Lenient,
}

impl AssemblyPolicy {
    /// Get the display name for this policy.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        }
    }
}

impl std::fmt::Display for AssemblyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Lifecycle of one scraping session (one link).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Navigating,
    /// A login wall was detected on the page.
    LoginRequired,
    /// Polling for sign-in completion, bounded by the login timeout.
    AwaitingLogin,
    Extracting,
    Saved,
    Failed,
}

impl SessionPhase {
    /// Phases that end a session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Saved | SessionPhase::Failed)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Navigating => write!(f, "navigating"),
            SessionPhase::LoginRequired => write!(f, "login required"),
            SessionPhase::AwaitingLogin => write!(f, "awaiting login"),
            SessionPhase::Extracting => write!(f, "extracting"),
            SessionPhase::Saved => write!(f, "saved"),
            SessionPhase::Failed => write!(f, "failed"),
        }
    }
}
