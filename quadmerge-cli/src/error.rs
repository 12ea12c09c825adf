//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use quadmerge::{MergeError, Stage};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to set up the merge (bad options, engine not runnable)
    Setup(MergeError),
    /// The merge run itself failed
    Merge(MergeError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Setup(e) if e.stage() == Some(Stage::Identify) => {
                eprintln!();
                eprintln!("ImageMagick could not be run. Either:");
                eprintln!("  1. Install ImageMagick so that 'convert' is on PATH");
                eprintln!("  2. Point --convert-executable at the convert binary");
                eprintln!("  3. Use the in-process engine: --engine builtin");
            }
            CliError::Merge(MergeError::NoTilesFound { depth: Some(_), .. }) => {
                eprintln!();
                eprintln!("Omit --depth to merge the deepest level that exists.");
            }
            CliError::Merge(MergeError::ExternalEngineFailure { .. }) => {
                eprintln!();
                eprintln!("Common issues:");
                eprintln!("  1. Not enough memory: lower --mem so ImageMagick spills to disk");
                eprintln!("  2. Temp directory full: point --temp at a larger disk");
                eprintln!("  3. Very large maps: merge a shallower level with --depth");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Setup(e) => write!(f, "{}", e),
            CliError::Merge(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Setup(e) | CliError::Merge(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MergeError> for CliError {
    fn from(e: MergeError) -> Self {
        CliError::Merge(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_merge_error_message_passes_through() {
        let err = CliError::Merge(MergeError::NoTilesFound {
            root: PathBuf::from("/maps/world"),
            depth: None,
        });
        assert_eq!(
            err.to_string(),
            "Directory /maps/world does not contain any tile images"
        );
    }

    #[test]
    fn test_config_error_prefix() {
        let err = CliError::Config("bad value".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad value");
    }
}
