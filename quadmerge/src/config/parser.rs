//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! The single place where INI key names are mapped to struct fields.

use std::path::PathBuf;

use ini::Ini;

use super::file::{ConfigFile, ConfigFileError};

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Blank values are treated as absent.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [engine] section
    if let Some(section) = ini.section(Some("engine")) {
        if let Some(v) = non_empty(section.get("kind")) {
            config.engine.kind = Some(v.parse().map_err(|reason| ConfigFileError::InvalidValue {
                section: "engine".to_string(),
                key: "kind".to_string(),
                value: v.to_string(),
                reason,
            })?);
        }
        if let Some(v) = non_empty(section.get("executable")) {
            config.engine.executable = Some(expand_tilde(v));
        }
        if let Some(v) = non_empty(section.get("memory_limit_gb")) {
            config.engine.memory_limit_gb =
                Some(v.parse().map_err(|_| ConfigFileError::InvalidValue {
                    section: "engine".to_string(),
                    key: "memory_limit_gb".to_string(),
                    value: v.to_string(),
                    reason: "must be a non-negative integer (0 = no limit)".to_string(),
                })?);
        }
        if let Some(v) = non_empty(section.get("timeout_secs")) {
            let secs = v
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigFileError::InvalidValue {
                    section: "engine".to_string(),
                    key: "timeout_secs".to_string(),
                    value: v.to_string(),
                    reason: "must be a positive integer (seconds)".to_string(),
                })?;
            config.engine.timeout_secs = Some(secs);
        }
    }

    // [merge] section
    if let Some(section) = ini.section(Some("merge")) {
        if let Some(v) = non_empty(section.get("temp_dir")) {
            config.merge.temp_dir = Some(expand_tilde(v));
        }
        if let Some(v) = non_empty(section.get("workers")) {
            let workers = v
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigFileError::InvalidValue {
                    section: "merge".to_string(),
                    key: "workers".to_string(),
                    value: v.to_string(),
                    reason: "must be a positive integer".to_string(),
                })?;
            config.merge.workers = Some(workers);
        }
        if let Some(v) = non_empty(section.get("tile_extension")) {
            let ext = v.trim_start_matches('.');
            if ext.is_empty() || ext.contains('.') {
                return Err(ConfigFileError::InvalidValue {
                    section: "merge".to_string(),
                    key: "tile_extension".to_string(),
                    value: v.to_string(),
                    reason: "expected a file extension like 'png'".to_string(),
                });
            }
            config.merge.tile_extension = Some(ext.to_string());
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("file")) {
            config.logging.file = Some(expand_tilde(v));
        }
    }

    Ok(config)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
