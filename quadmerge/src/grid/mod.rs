//! Two-phase grid reconstruction.
//!
//! Phase one stitches each grid row left to right into its own image. Phase
//! two stacks the finished rows top to bottom. No single engine call ever
//! sees more than `width` images, so argument lists and peak engine memory
//! grow with the grid side rather than its area.
//!
//! Rows share nothing but the read-only placeholder, so with more than one
//! worker they are built on a bounded rayon pool. The vertical stack always
//! waits for every row and takes them in row order.

mod plan;

pub use plan::{GridPlan, TileSource};

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::engine::RasterEngine;
use crate::error::{MergeError, MergeResult, Stage};
use crate::scratch::ScratchDir;

/// Drives the engine through row composition and the final merge.
pub struct GridReconstructor<'a> {
    engine: &'a dyn RasterEngine,
    workers: usize,
}

impl<'a> GridReconstructor<'a> {
    /// `workers` bounds how many rows are composed at once; `1` is sequential.
    pub fn new(engine: &'a dyn RasterEngine, workers: usize) -> Self {
        Self {
            engine,
            workers: workers.max(1),
        }
    }

    /// Build the whole grid into `output`.
    pub fn reconstruct(
        &self,
        plan: &GridPlan<'_>,
        placeholder: &Path,
        scratch: &ScratchDir,
        output: &Path,
    ) -> MergeResult<()> {
        let rows = self.compose_rows(plan, placeholder, scratch)?;
        self.merge_rows(&rows, output)
    }

    /// Write one image per grid row and return their paths in row order.
    pub fn compose_rows(
        &self,
        plan: &GridPlan<'_>,
        placeholder: &Path,
        scratch: &ScratchDir,
    ) -> MergeResult<Vec<PathBuf>> {
        let width = plan.width();
        info!(
            rows = width,
            workers = self.workers,
            engine = self.engine.name(),
            "Generating rows"
        );

        let compose = |row: u32| -> MergeResult<PathBuf> {
            let inputs = plan.row_inputs(row, placeholder);
            let output = scratch.row_path(row);
            debug!(row, tiles = inputs.len(), "Generating row");
            self.engine
                .append_horizontal(&inputs, &output)
                .map_err(|source| MergeError::engine(Stage::Row(row), source))?;
            Ok(output)
        };

        let rows = if self.workers == 1 {
            (0..width).map(compose).collect::<MergeResult<Vec<_>>>()?
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .thread_name(|i| format!("quadmerge-row-{}", i))
                .build()
                .map_err(|e| {
                    MergeError::InvalidOption(format!(
                        "cannot start {} row workers: {}",
                        self.workers, e
                    ))
                })?;
            // Indexed collect keeps row order whatever order rows finish in
            pool.install(|| {
                (0..width)
                    .into_par_iter()
                    .map(compose)
                    .collect::<MergeResult<Vec<_>>>()
            })?
        };

        info!(rows = rows.len(), "Done generating rows");
        Ok(rows)
    }

    /// Stack row images top to bottom into `output`.
    pub fn merge_rows(&self, rows: &[PathBuf], output: &Path) -> MergeResult<()> {
        info!(rows = rows.len(), "Merging rows into single image");
        self.engine
            .append_vertical(rows, output)
            .map_err(|source| MergeError::engine(Stage::Merge, source))
    }
}
