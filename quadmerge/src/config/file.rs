//! Optional `config.ini` with per-user defaults.
//!
//! Every key is optional. Values found here are laid over
//! [`MergeConfig::default`], and command-line flags override both.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::merge::MergeConfig;
use crate::engine::EngineKind;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read or parse the file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// A key holds a value that cannot be used
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// `[engine]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSettings {
    pub kind: Option<EngineKind>,
    pub executable: Option<PathBuf>,
    pub memory_limit_gb: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// `[merge]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSettings {
    pub temp_dir: Option<PathBuf>,
    pub workers: Option<usize>,
    pub tile_extension: Option<String>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Also write logs to this file.
    pub file: Option<PathBuf>,
}

/// Contents of `config.ini`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub engine: EngineSettings,
    pub merge: MergeSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Load from the default location, or defaults if there is no file.
    pub fn load() -> Result<Self, ConfigFileError> {
        match config_file_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Run configuration with this file's values applied to the defaults.
    pub fn to_merge_config(&self) -> MergeConfig {
        let mut config = MergeConfig::default();

        if let Some(kind) = self.engine.kind {
            config = config.with_engine(kind);
        }
        if let Some(exe) = &self.engine.executable {
            config = config.with_executable(exe.clone());
        }
        if let Some(gb) = self.engine.memory_limit_gb {
            config = config.with_memory_limit_gb(gb);
        }
        if let Some(secs) = self.engine.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(dir) = &self.merge.temp_dir {
            config = config.with_temp_dir(dir.clone());
        }
        if let Some(workers) = self.merge.workers {
            config = config.with_workers(workers);
        }
        if let Some(ext) = &self.merge.tile_extension {
            config = config.with_tile_extension(ext.clone());
        }

        config
    }
}

/// Directory holding `config.ini` (`$XDG_CONFIG_HOME/quadmerge` on Linux).
pub fn config_directory() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("quadmerge"))
}

/// Default path of `config.ini`.
pub fn config_file_path() -> Option<PathBuf> {
    config_directory().map(|dir| dir.join("config.ini"))
}
