//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::logging::LogConfig;
use crate::models::AssemblyPolicy;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Pipeline behavior (splitting, workers, language).
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Audio enhancement filter chain.
    #[serde(default)]
    pub enhance: EnhanceSettings,

    /// Scraping session behavior.
    #[serde(default)]
    pub scraper: ScraperSettings,

    /// Transcript assembly behavior.
    #[serde(default)]
    pub assembly: AssemblySettings,

    /// External tool locations and command templates.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Run-log configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            paths: PathSettings::default(),
            pipeline: PipelineSettings::default(),
            enhance: EnhanceSettings::default(),
            scraper: ScraperSettings::default(),
            assembly: AssemblySettings::default(),
            engine: EngineSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Settings {
    /// Store root as a path.
    pub fn store_root(&self) -> PathBuf {
        PathBuf::from(&self.paths.store_root)
    }

    /// Log directory, resolved against the store root when relative.
    pub fn logs_dir(&self) -> PathBuf {
        resolve_against(&self.store_root(), &self.paths.logs_folder)
    }

    /// Scratch directory for in-flight tool output, resolved against the
    /// store root when relative so renames into stages stay on one filesystem.
    pub fn work_dir(&self) -> PathBuf {
        resolve_against(&self.store_root(), &self.paths.work_folder)
    }

    /// Browser profile directory, resolved against the store root.
    pub fn profile_dir(&self) -> PathBuf {
        resolve_against(&self.store_root(), &self.scraper.profile_folder)
    }

    /// Build a run-log configuration from the logging section.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            compact: self.logging.compact,
            progress_step: self.logging.progress_step,
            error_tail: self.logging.error_tail as usize,
            ..LogConfig::default()
        }
    }
}

fn resolve_against(root: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}

/// Path configuration for the store root, logs, and scratch space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root directory holding the stage folders.
    #[serde(default = "default_store_root")]
    pub store_root: String,

    /// Folder for run log files (relative paths resolve against the root).
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Folder for in-flight tool output before the rename into a stage.
    #[serde(default = "default_work_folder")]
    pub work_folder: String,
}

fn default_store_root() -> String {
    "pipeline_data".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

fn default_work_folder() -> String {
    ".work".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            store_root: default_store_root(),
            logs_folder: default_logs_folder(),
            work_folder: default_work_folder(),
        }
    }
}

/// Pipeline behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Segment length in minutes when splitting media.
    #[serde(default = "default_split_minutes")]
    pub split_minutes: u32,

    /// Worker threads for per-logical-name processing.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Language tag attached to split segments and carried to assembly.
    #[serde(default = "default_language")]
    pub language: String,

    /// Redo stages even when output already exists.
    #[serde(default)]
    pub overwrite: bool,
}

fn default_split_minutes() -> u32 {
    15
}

fn default_workers() -> usize {
    8
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            split_minutes: default_split_minutes(),
            workers: default_workers(),
            language: default_language(),
            overwrite: false,
        }
    }
}

/// Audio enhancement filter chain applied between split and transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhanceSettings {
    /// Run the enhancement pass at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// High-pass cutoff in Hz.
    #[serde(default = "default_lowcut")]
    pub lowcut_hz: u32,

    /// Low-pass cutoff in Hz.
    #[serde(default = "default_highcut")]
    pub highcut_hz: u32,

    /// Compressor threshold in dB.
    #[serde(default = "default_compress_threshold")]
    pub compress_threshold_db: f64,

    /// Compressor ratio.
    #[serde(default = "default_compress_ratio")]
    pub compress_ratio: f64,

    /// Make-up gain in dB.
    #[serde(default = "default_gain")]
    pub gain_db: f64,
}

fn default_true() -> bool {
    true
}

fn default_lowcut() -> u32 {
    100
}

fn default_highcut() -> u32 {
    6000
}

fn default_compress_threshold() -> f64 {
    -30.0
}

fn default_compress_ratio() -> f64 {
    4.0
}

fn default_gain() -> f64 {
    8.0
}

impl Default for EnhanceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            lowcut_hz: default_lowcut(),
            highcut_hz: default_highcut(),
            compress_threshold_db: default_compress_threshold(),
            compress_ratio: default_compress_ratio(),
            gain_db: default_gain(),
        }
    }
}

/// Scraping session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperSettings {
    /// Seconds to wait for a human to finish logging in.
    #[serde(default = "default_login_timeout")]
    pub login_timeout_secs: u64,

    /// Poll interval while waiting for login and between scroll steps,
    /// in milliseconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Run the browser headless. Turn off for interactive logins.
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Browser profile folder, kept so logins survive between runs.
    #[serde(default = "default_profile_folder")]
    pub profile_folder: String,

    /// Hard cap on the row-collection scroll loop, in seconds.
    #[serde(default = "default_scroll_max")]
    pub scroll_max_secs: u64,

    /// Consecutive unchanged row counts before the scroll loop stops.
    #[serde(default = "default_scroll_stable_rounds")]
    pub scroll_stable_rounds: u32,
}

fn default_login_timeout() -> u64 {
    600
}

fn default_poll_interval() -> u64 {
    500
}

fn default_profile_folder() -> String {
    ".browser_profile".to_string()
}

fn default_scroll_max() -> u64 {
    180
}

fn default_scroll_stable_rounds() -> u32 {
    5
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            login_timeout_secs: default_login_timeout(),
            poll_interval_ms: default_poll_interval(),
            headless: true,
            profile_folder: default_profile_folder(),
            scroll_max_secs: default_scroll_max(),
            scroll_stable_rounds: default_scroll_stable_rounds(),
        }
    }
}

/// Transcript assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblySettings {
    /// How missing fragments are treated.
    #[serde(default)]
    pub policy: AssemblyPolicy,

    /// Prefix each fragment with its language tag.
    #[serde(default)]
    pub tag_language: bool,
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            policy: AssemblyPolicy::default(),
            tag_language: false,
        }
    }
}

/// External tool locations and command templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// ffmpeg binary (name on PATH or absolute path).
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_path: String,

    /// ffprobe binary.
    #[serde(default = "default_ffprobe")]
    pub ffprobe_path: String,

    /// Transcriber command template with `{input}` and `{output}`
    /// placeholders. Unset means the transcription step cannot run.
    #[serde(default)]
    pub transcriber_command: Option<String>,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg(),
            ffprobe_path: default_ffprobe(),
            transcriber_command: None,
        }
    }
}

/// Run-log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Use compact log format.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of tool-output lines to show after a failure.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Pipeline,
    Enhance,
    Scraper,
    Assembly,
    Engine,
    Logging,
}

impl ConfigSection {
    /// Every section, in the order the generated file lists them.
    pub const ALL: [ConfigSection; 7] = [
        ConfigSection::Paths,
        ConfigSection::Pipeline,
        ConfigSection::Enhance,
        ConfigSection::Scraper,
        ConfigSection::Assembly,
        ConfigSection::Engine,
        ConfigSection::Logging,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Pipeline => "pipeline",
            ConfigSection::Enhance => "enhance",
            ConfigSection::Scraper => "scraper",
            ConfigSection::Assembly => "assembly",
            ConfigSection::Engine => "engine",
            ConfigSection::Logging => "logging",
        }
    }

    /// One-line description written above the section in generated files.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Store root and working directories",
            ConfigSection::Pipeline => "Pipeline behavior",
            ConfigSection::Enhance => "Audio enhancement filter chain",
            ConfigSection::Scraper => "Scraping session behavior",
            ConfigSection::Assembly => "Transcript assembly",
            ConfigSection::Engine => "External tools",
            ConfigSection::Logging => "Run-log configuration",
        }
    }
}
