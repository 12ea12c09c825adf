//! Configuration for merge runs.
//!
//! - [`MergeConfig`] - options of a single run, built with `with_*` methods
//! - [`ConfigFile`] - optional `config.ini` holding per-user defaults
//!
//! # Example
//!
//! ```
//! use quadmerge::config::{ConfigFile, MergeConfig};
//!
//! // No file on disk yields the defaults
//! let file = ConfigFile::default();
//! let config = file.to_merge_config().with_resize_percent(50);
//! assert_eq!(config.resize_percent(), 50);
//! ```

mod file;
mod merge;
mod parser;

pub use file::{
    config_directory, config_file_path, ConfigFile, ConfigFileError, EngineSettings,
    LoggingSettings, MergeSettings,
};
pub use merge::{
    MergeConfig, DEFAULT_ENGINE_TIMEOUT_SECS, DEFAULT_MEMORY_LIMIT_GB, DEFAULT_TILE_EXTENSION,
};
