//! Error types for a merge run.
//!
//! Every fatal condition of a run maps to one [`MergeError`] variant. Engine
//! failures carry the [`Stage`] they happened in so the operator can tell a
//! failed row from a failed crop without reading engine internals.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::engine::EngineError;

/// Result type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Pipeline step that invoked the raster engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Probing a sample tile for its pixel size.
    Identify,
    /// Synthesizing the transparent placeholder tile.
    Placeholder,
    /// Concatenating one row of tiles left to right.
    Row(u32),
    /// Stacking all rows top to bottom.
    Merge,
    /// Trimming the uniform border.
    Crop,
    /// Scaling to a percentage of the original size.
    Resize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Identify => write!(f, "tile size probe"),
            Stage::Placeholder => write!(f, "placeholder synthesis"),
            Stage::Row(row) => write!(f, "row generation (row {})", row),
            Stage::Merge => write!(f, "row merge"),
            Stage::Crop => write!(f, "crop"),
            Stage::Resize => write!(f, "resize"),
        }
    }
}

/// Errors that abort a merge run.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The locator found nothing to merge.
    #[error("{}", no_tiles_message(.root, .depth))]
    NoTilesFound {
        root: PathBuf,
        depth: Option<u32>,
    },

    /// The input path does not exist.
    #[error("Input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// Reading the input tree failed.
    #[error("Failed to scan {}: {source}", .path.display())]
    Scan { path: PathBuf, source: io::Error },

    /// A raster engine invocation failed.
    #[error("{stage} failed: {source}")]
    ExternalEngineFailure { stage: Stage, source: EngineError },

    /// The placeholder tile could not be probed or synthesized.
    #[error("Failed to create placeholder tile: {0}")]
    PlaceholderCreationFailed(#[source] EngineError),

    /// Moving the finished image to its destination failed.
    #[error("Failed to write output {}: {source}", .path.display())]
    OutputWriteFailure { path: PathBuf, source: io::Error },

    /// The scratch directory could not be prepared.
    #[error("Failed to prepare temporary directory {}: {source}", .path.display())]
    ScratchDirectory { path: PathBuf, source: io::Error },

    /// A run option is out of range.
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

fn no_tiles_message(root: &std::path::Path, depth: &Option<u32>) -> String {
    match depth {
        Some(depth) => format!(
            "Directory {} contains no tile images at depth {}",
            root.display(),
            depth
        ),
        None => format!(
            "Directory {} does not contain any tile images",
            root.display()
        ),
    }
}

impl MergeError {
    /// Wrap an engine failure with the stage it happened in.
    pub fn engine(stage: Stage, source: EngineError) -> Self {
        MergeError::ExternalEngineFailure { stage, source }
    }

    /// The stage an engine failure belongs to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            MergeError::ExternalEngineFailure { stage, .. } => Some(*stage),
            MergeError::PlaceholderCreationFailed(_) => Some(Stage::Placeholder),
            _ => None,
        }
    }
}
