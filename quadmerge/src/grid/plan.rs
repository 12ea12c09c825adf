//! Cell-by-cell layout of the reconstructed grid.
//!
//! Rows are resolved on demand from the located tiles, so a plan costs no
//! more than the tile set it borrows, however large the grid.

use std::path::{Path, PathBuf};

use crate::locator::TileSet;
use crate::quadtree::{address, grid_width};

/// What fills one grid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileSource {
    /// A tile file found in the pyramid.
    Real(PathBuf),
    /// No file at this address; the shared placeholder is used.
    Placeholder,
}

impl TileSource {
    /// Path handed to the engine for this cell.
    pub fn resolve<'a>(&'a self, placeholder: &'a Path) -> &'a Path {
        match self {
            TileSource::Real(path) => path,
            TileSource::Placeholder => placeholder,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, TileSource::Placeholder)
    }
}

/// A `2^depth` square grid over the located tiles, rows top to bottom and
/// cells left to right.
#[derive(Debug, Clone, Copy)]
pub struct GridPlan<'a> {
    tiles: &'a TileSet,
}

impl<'a> GridPlan<'a> {
    pub fn new(tiles: &'a TileSet) -> Self {
        Self { tiles }
    }

    pub fn depth(&self) -> u32 {
        self.tiles.depth()
    }

    pub fn width(&self) -> u32 {
        grid_width(self.depth())
    }

    /// Cells that fall back to the placeholder.
    pub fn placeholder_count(&self) -> u64 {
        let width = u64::from(self.width());
        (width * width).saturating_sub(self.tiles.len() as u64)
    }

    /// Cells of `row`, left to right. Empty when `row` is outside the grid.
    pub fn row(&self, row: u32) -> Vec<TileSource> {
        let width = self.width();
        if row >= width {
            return Vec::new();
        }
        let depth = self.depth();

        (0..width)
            .map(|col| match self.tiles.get(&address(row, col, depth)) {
                Some(path) => TileSource::Real(path.to_path_buf()),
                None => TileSource::Placeholder,
            })
            .collect()
    }

    /// Engine input list for `row`, left to right.
    pub fn row_inputs(&self, row: u32, placeholder: &Path) -> Vec<PathBuf> {
        self.row(row)
            .iter()
            .map(|cell| cell.resolve(placeholder).to_path_buf())
            .collect()
    }
}
