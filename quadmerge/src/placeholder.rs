//! Transparent stand-in for missing tiles.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::engine::{Dimensions, RasterEngine};
use crate::error::{MergeError, MergeResult};

/// A blank tile, written once and shared by every empty grid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    path: PathBuf,
    size: Dimensions,
}

impl Placeholder {
    /// Probe `sample` for its size and write a transparent tile of that size
    /// to `target`.
    ///
    /// Either engine call failing is fatal for the run.
    pub fn materialize(
        engine: &dyn RasterEngine,
        sample: &Path,
        target: &Path,
    ) -> MergeResult<Self> {
        let size = engine
            .dimensions(sample)
            .map_err(MergeError::PlaceholderCreationFailed)?;

        engine
            .blank(size, target)
            .map_err(MergeError::PlaceholderCreationFailed)?;

        debug!(
            sample = %sample.display(),
            size = %size,
            path = %target.display(),
            "Placeholder tile created"
        );

        Ok(Self {
            path: target.to_path_buf(),
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pixel size shared by every tile in the pyramid.
    pub fn size(&self) -> Dimensions {
        self.size
    }
}
