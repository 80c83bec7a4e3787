//! Loading, saving and section-level editing of the settings file.
//!
//! Every write goes through a temp file followed by a rename, so a
//! crash never leaves a half-written config behind. Section updates
//! re-read the file and replace only the named table, which keeps
//! hand-written comments in the other sections alive.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

/// Errors from reading, writing or editing the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file i/o: {0}")]
    Io(#[from] io::Error),

    #[error("config file does not parse: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("settings do not serialize: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("config file does not parse for editing: {0}")]
    Edit(#[from] toml_edit::TomlError),

    #[error("no config file at {0}")]
    NotFound(PathBuf),
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Owns the settings file and the settings loaded from it.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Point the manager at a settings file. Nothing is read until
    /// [`load`](Self::load) or [`load_or_create`](Self::load_or_create).
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory settings; nothing reaches disk until [`save`](Self::save)
    /// or [`update_section`](Self::update_section).
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Load the settings file, failing when it does not exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        self.settings = toml::from_str(&content)?;
        Ok(())
    }

    /// Load the settings file, writing a commented default one first
    /// when none exists.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            self.load()?;
        } else {
            if let Some(parent) = self.config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            self.settings = Settings::default();
            self.save()?;
        }
        Ok(())
    }

    /// Create the store root, log and scratch directories the loaded
    /// settings point at.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let dirs = [
            self.settings.store_root(),
            self.settings.logs_dir(),
            self.settings.work_dir(),
        ];

        for path in dirs {
            if !path.exists() {
                fs::create_dir_all(&path)?;
            }
        }

        Ok(())
    }

    /// Write the whole config atomically.
    pub fn save(&self) -> ConfigResult<()> {
        let content = self.generate_config_with_comments()?;
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Replace one section on disk, leaving the rest of the file (and
    /// its comments) untouched.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let current = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)?
        } else {
            String::new()
        };

        let mut doc: DocumentMut = if current.is_empty() {
            DocumentMut::new()
        } else {
            current.parse()?
        };

        let fresh: DocumentMut = self.section_body(section)?.parse()?;
        doc[section.table_name()] = Item::Table(fresh.as_table().clone());

        self.atomic_write(&doc.to_string())?;
        Ok(())
    }

    /// Serialized body of one section, without its `[table]` header.
    fn section_body(&self, section: ConfigSection) -> ConfigResult<String> {
        let body = match section {
            ConfigSection::Paths => toml::to_string_pretty(&self.settings.paths)?,
            ConfigSection::Pipeline => toml::to_string_pretty(&self.settings.pipeline)?,
            ConfigSection::Enhance => toml::to_string_pretty(&self.settings.enhance)?,
            ConfigSection::Scraper => toml::to_string_pretty(&self.settings.scraper)?,
            ConfigSection::Assembly => toml::to_string_pretty(&self.settings.assembly)?,
            ConfigSection::Engine => toml::to_string_pretty(&self.settings.engine)?,
            ConfigSection::Logging => toml::to_string_pretty(&self.settings.logging)?,
        };
        Ok(body)
    }

    fn generate_config_with_comments(&self) -> ConfigResult<String> {
        let mut output = String::from(
            "# mediascribe configuration\n\
             # Section updates rewrite only the table they name.\n\n",
        );

        for section in ConfigSection::ALL {
            output.push_str(&format!(
                "# {}\n[{}]\n",
                section.comment(),
                section.table_name()
            ));
            output.push_str(&self.section_body(section)?);
            output.push('\n');
        }

        Ok(output)
    }

    /// Temp file in the same directory, so the rename stays atomic.
    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.config_path.with_extension("toml.tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }
}
