//! mediascribe - command line front end for the transcript pipeline.
//!
//! Loads the TOML config (creating it on first run), applies flag
//! overrides, then hands the store to [`RunProcessor`] with the run
//! log echoed to the console. The exit code is nonzero when the run
//! aborts or every source fails.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use scribe_core::config::{ConfigManager, Settings};
use scribe_core::logging::{init_tracing, LogLevel};
use scribe_core::models::RunMode;
use scribe_core::orchestrator::{RunProcessor, RunSummary};

/// Turn staged media, saved pages and link catalogs into transcripts
#[derive(Parser, Debug)]
#[command(name = "mediascribe", version, about = "Turn staged media, saved pages and link catalogs into transcripts")]
struct Cli {
    /// Pipeline to run (auto inspects the store)
    #[arg(long, value_enum, default_value_t = Mode::Auto)]
    mode: Mode,

    /// Store root directory with the stage folders
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Segment length in minutes when splitting media
    #[arg(long, value_name = "MINUTES")]
    split_minutes: Option<u32>,

    /// Worker threads for per-source processing
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Seconds to wait for an interactive sign-in while scraping
    #[arg(long, value_name = "SECONDS")]
    login_timeout: Option<u64>,

    /// Redo stages even when output already exists
    #[arg(long)]
    overwrite: bool,

    /// Show the browser window during scraping (needed for first logins)
    #[arg(long)]
    no_headless: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Diagnostic verbosity when RUST_LOG is unset
    #[arg(long, value_enum, default_value_t = Level::Info)]
    log_level: Level,
}

/// Pipeline selection on the command line.
#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Auto,
    Audio,
    Video,
    Html,
    Sharepoint,
}

impl From<Mode> for RunMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Auto => RunMode::Auto,
            Mode::Audio => RunMode::Audio,
            Mode::Video => RunMode::Video,
            Mode::Html => RunMode::Html,
            Mode::Sharepoint => RunMode::SharePoint,
        }
    }
}

/// Diagnostic verbosity on the command line.
#[derive(ValueEnum, Clone, Copy, Debug)]
enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Trace => LogLevel::Trace,
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warn,
            Level::Error => LogLevel::Error,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level.into());

    match run(cli) {
        Ok(summary) if summary.all_failed() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<RunSummary> {
    let mode = RunMode::from(cli.mode);
    let settings = load_settings(&cli)?;

    let mut processor =
        RunProcessor::new(settings).with_log_sink(Box::new(|line| println!("{line}")));
    let summary = processor.run(mode)?;
    Ok(summary)
}

/// Load configuration and apply flag overrides.
///
/// Priority order:
/// 1. Command-line flags
/// 2. Config file (--config, or the default user config path)
/// 3. Built-in defaults (written to the config file on first run)
fn load_settings(cli: &Cli) -> Result<Settings> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut manager = ConfigManager::new(&config_path);
    manager
        .load_or_create()
        .with_context(|| format!("load config {}", config_path.display()))?;

    let settings = manager.settings_mut();
    if let Some(root) = &cli.root {
        settings.paths.store_root = root.to_string_lossy().into_owned();
    }
    if let Some(minutes) = cli.split_minutes {
        settings.pipeline.split_minutes = minutes;
    }
    if let Some(workers) = cli.workers {
        settings.pipeline.workers = workers.max(1);
    }
    if let Some(secs) = cli.login_timeout {
        settings.scraper.login_timeout_secs = secs;
    }
    if cli.overwrite {
        settings.pipeline.overwrite = true;
    }
    if cli.no_headless {
        settings.scraper.headless = false;
    }

    manager
        .ensure_dirs_exist()
        .context("create working directories")?;
    Ok(manager.settings().clone())
}

/// Default config path: ~/.config/mediascribe/config.toml
fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mediascribe")
        .join("config.toml")
}
