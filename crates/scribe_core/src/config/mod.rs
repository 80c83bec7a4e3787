//! Configuration management for the transcript pipeline.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only the changed section is modified)
//!
//! # Example
//!
//! ```no_run
//! use scribe_core::config::{ConfigManager, ConfigSection};
//!
//! // Create manager and load (or create default) config
//! let mut config = ConfigManager::new(".config/mediascribe.toml");
//! config.load_or_create().unwrap();
//!
//! // Read settings
//! println!("Store root: {}", config.settings().paths.store_root);
//!
//! // Modify a setting
//! config.settings_mut().scraper.headless = false;
//!
//! // Save just the scraper section atomically
//! config.update_section(ConfigSection::Scraper).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AssemblySettings, ConfigSection, EngineSettings, EnhanceSettings, LoggingSettings,
    PathSettings, PipelineSettings, ScraperSettings, Settings,
};
