//! Tile discovery.
//!
//! Walks an input pyramid and collects the tile files that make up one zoom
//! level, keyed by their quadtree address.
//!
//! Which level is used:
//!
//! - With an explicit depth, every tile whose path has exactly that many
//!   components (`0/3/1.png` is depth 3). This picks an intermediate zoom
//!   level, since renderers keep a parent tile beside each child directory.
//! - Without one, tiles sitting in directories that have no subdirectories.
//!   If such leaves exist at several depths the deepest one wins.
//!
//! An input path that is itself a tile file is a depth-0 pyramid.

mod listing;

pub use listing::{is_leaf, EntryKind, Listing, ListingEntry};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};

use crate::error::{MergeError, MergeResult};
use crate::quadtree::{grid_width, QuadDigit, QuadPath, MAX_DEPTH};

/// Tiles of one pyramid level, keyed by address.
#[derive(Debug, Clone)]
pub struct TileSet {
    depth: u32,
    tiles: BTreeMap<QuadPath, PathBuf>,
}

impl TileSet {
    /// Build a set from located tiles.
    ///
    /// Every address must have `depth` digits.
    pub fn new(depth: u32, tiles: BTreeMap<QuadPath, PathBuf>) -> Self {
        debug_assert!(tiles.keys().all(|addr| addr.depth() == depth));
        Self { depth, tiles }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Tiles per side of the reconstructed grid.
    pub fn width(&self) -> u32 {
        grid_width(self.depth)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// File holding the tile at `address`, if it exists.
    pub fn get(&self, address: &QuadPath) -> Option<&Path> {
        self.tiles.get(address).map(PathBuf::as_path)
    }

    /// Tile with the lowest address, used to probe the tile size.
    pub fn sample(&self) -> Option<&Path> {
        self.tiles.values().next().map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuadPath, &Path)> {
        self.tiles.iter().map(|(addr, path)| (addr, path.as_path()))
    }
}

/// Scans an input tree for tiles.
#[derive(Debug, Clone)]
pub struct TileLocator {
    extension: String,
    depth: Option<u32>,
}

impl Default for TileLocator {
    fn default() -> Self {
        Self::new("png")
    }
}

impl TileLocator {
    /// Locator for tiles with file extension `extension` (without the dot).
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            depth: None,
        }
    }

    /// Only accept tiles at exactly `depth` levels; `None` auto-detects.
    pub fn with_depth(mut self, depth: Option<u32>) -> Self {
        self.depth = depth;
        self
    }

    /// Find the tiles below `root`.
    ///
    /// Read-only. Fails with [`MergeError::NoTilesFound`] when nothing
    /// qualifies.
    pub fn locate(&self, root: &Path) -> MergeResult<TileSet> {
        if !root.exists() {
            return Err(MergeError::InputNotFound(root.to_path_buf()));
        }

        info!(root = %root.display(), depth = ?self.depth, "Scanning for tile images");

        let tiles = if root.is_file() {
            self.locate_single_file(root)
        } else {
            self.locate_in_tree(root)?
        };

        let Some(depth) = tiles.keys().next().map(QuadPath::depth) else {
            return Err(MergeError::NoTilesFound {
                root: root.to_path_buf(),
                depth: self.depth,
            });
        };

        let set = TileSet::new(depth, tiles);
        info!(
            depth = set.depth(),
            width = set.width(),
            tiles = set.len(),
            "Located tiles"
        );
        Ok(set)
    }

    fn locate_single_file(&self, file: &Path) -> BTreeMap<QuadPath, PathBuf> {
        let mut tiles = BTreeMap::new();
        let depth_ok = matches!(self.depth, None | Some(0));
        let ext_ok = file
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == self.extension);

        if depth_ok && ext_ok {
            tiles.insert(QuadPath::default(), file.to_path_buf());
        }
        tiles
    }

    fn locate_in_tree(&self, root: &Path) -> MergeResult<BTreeMap<QuadPath, PathBuf>> {
        let mut found = Vec::new();
        self.walk(root, root, 0, &mut found)?;

        // Auto-detect keeps only the deepest leaf level
        let target = match self.depth {
            Some(depth) => Some(depth),
            None => found.iter().map(|(addr, _)| addr.depth()).max(),
        };

        Ok(found
            .into_iter()
            .filter(|(addr, _)| Some(addr.depth()) == target)
            .collect())
    }

    /// Collect candidate tiles from `dir`, then descend into digit-named
    /// subdirectories.
    ///
    /// `level` is the number of components between `root` and `dir`.
    fn walk(
        &self,
        root: &Path,
        dir: &Path,
        level: u32,
        found: &mut Vec<(QuadPath, PathBuf)>,
    ) -> MergeResult<()> {
        let listing = Listing::read(dir).map_err(|source| MergeError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;

        let accepts_files = match self.depth {
            Some(depth) => level + 1 == depth,
            None => is_leaf(&listing),
        };

        if accepts_files {
            for entry in listing.files() {
                let path = dir.join(&entry.name);
                let Ok(relative) = path.strip_prefix(root) else {
                    continue;
                };
                match QuadPath::from_relative_path(relative, &self.extension) {
                    Some(address) => found.push((address, path)),
                    None => trace!(path = %path.display(), "Skipping non-tile file"),
                }
            }
        }

        // Files below this point would exceed the requested depth
        let may_descend = match self.depth {
            Some(depth) => level + 1 < depth,
            None => level + 1 < MAX_DEPTH,
        };
        if !may_descend {
            return Ok(());
        }

        for entry in listing.directories() {
            if !is_digit_name(&entry.name) {
                debug!(dir = %dir.join(&entry.name).display(), "Skipping non-digit directory");
                continue;
            }
            self.walk(root, &dir.join(&entry.name), level + 1, found)?;
        }

        Ok(())
    }
}

fn is_digit_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(
        (chars.next().and_then(QuadDigit::from_char), chars.next()),
        (Some(_), None)
    )
}
