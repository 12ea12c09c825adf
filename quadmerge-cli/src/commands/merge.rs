//! Merge command - flatten a tile pyramid into one image.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use quadmerge::config::ConfigFile;
use quadmerge::logging::{init_logging, LoggingOptions};
use quadmerge::scratch::remove_if_present;
use quadmerge::{EngineKind, MergeConfig, Merger};
use tracing::info;

use crate::error::CliError;

/// Arguments for the merge command.
#[derive(Debug, Clone, Default)]
pub struct MergeArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub temp: Option<PathBuf>,
    pub convert_executable: Option<PathBuf>,
    pub mem: Option<u32>,
    pub depth: Option<u32>,
    pub verbose: bool,
    pub crop: bool,
    pub resize: u32,
    pub engine: Option<EngineKind>,
    pub workers: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub config: Option<PathBuf>,
}

/// Load the configuration file named on the command line, or the default one.
fn load_config_file(path: Option<&PathBuf>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "config file '{}' does not exist",
                    path.display()
                )));
            }
            ConfigFile::load_from(path)
        }
        None => ConfigFile::load(),
    }
    .map_err(|e| CliError::Config(e.to_string()))
}

/// Lay command-line flags over the configuration file.
pub fn resolve_config(args: &MergeArgs, file: &ConfigFile) -> MergeConfig {
    let mut config = file
        .to_merge_config()
        .with_verbose(args.verbose)
        .with_depth(args.depth)
        .with_crop(args.crop)
        .with_resize_percent(args.resize);

    if let Some(temp) = &args.temp {
        config = config.with_temp_dir(temp.clone());
    }
    if let Some(exe) = &args.convert_executable {
        config = config.with_executable(exe.clone());
    }
    if let Some(mem) = args.mem {
        config = config.with_memory_limit_gb(mem);
    }
    if let Some(engine) = args.engine {
        config = config.with_engine(engine);
    }
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    if let Some(secs) = args.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    config
}

/// Run the merge command.
pub fn run(args: MergeArgs) -> Result<(), CliError> {
    let file = load_config_file(args.config.as_ref())?;

    let _logging = init_logging(&LoggingOptions {
        verbose: args.verbose,
        file: file.logging.file.clone(),
    })
    .map_err(|e| CliError::LoggingInit(e.to_string()))?;

    let config = resolve_config(&args, &file);
    let merger = Merger::new(config).map_err(CliError::Setup)?;
    info!(
        version = quadmerge::VERSION,
        engine = merger.engine_name(),
        input = %args.input.display(),
        "quadmerge starting"
    );

    // Interrupting skips destructors, so the handler cleans up itself.
    // Engine processes go first so none writes into the removed directory.
    let scratch = merger.scratch_path();
    let children = merger.running_children();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Interrupted, stopping ImageMagick and removing temporary files...");
        children.kill_all();
        let _ = remove_if_present(&scratch);
        process::exit(1);
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let report = merger.run(&args.input, &args.output)?;

    println!(
        "Merged {} tiles at depth {} ({}x{} grid, {} empty)",
        report.tiles_found, report.depth, report.width, report.width, report.placeholders_used
    );
    println!("Output: {}", report.output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadmerge::config::{EngineSettings, MergeSettings};

    fn args() -> MergeArgs {
        MergeArgs {
            input: PathBuf::from("map"),
            output: PathBuf::from("world"),
            resize: 100,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_without_file_or_flags() {
        let config = resolve_config(&args(), &ConfigFile::default());
        assert_eq!(config, MergeConfig::default());
    }

    #[test]
    fn test_flags_override_file() {
        let file = ConfigFile {
            engine: EngineSettings {
                kind: Some(EngineKind::Builtin),
                memory_limit_gb: Some(2),
                ..Default::default()
            },
            merge: MergeSettings {
                workers: Some(6),
                temp_dir: Some(PathBuf::from("/from/file")),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut a = args();
        a.mem = Some(16);
        a.temp = Some(PathBuf::from("/from/flag"));
        a.crop = true;

        let config = resolve_config(&a, &file);

        assert_eq!(config.memory_limit_gb(), 16);
        assert_eq!(config.temp_dir(), &PathBuf::from("/from/flag"));
        assert_eq!(config.engine(), EngineKind::Builtin);
        assert_eq!(config.workers(), 6);
        assert!(config.crop());
    }

    #[test]
    fn test_missing_explicit_config_file_is_error() {
        let path = PathBuf::from("/definitely/not/here/config.ini");
        assert!(matches!(
            load_config_file(Some(&path)),
            Err(CliError::Config(_))
        ));
    }
}
