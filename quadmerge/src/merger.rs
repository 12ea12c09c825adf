//! End-to-end merge run.
//!
//! [`Merger::run`] ties the pieces together:
//!
//! 1. acquire the scratch directory (clearing leftovers)
//! 2. locate tiles and settle the pyramid depth
//! 3. write the placeholder from a sample tile
//! 4. compose rows, then stack them
//! 5. crop and resize if asked
//! 6. move the result to the destination
//!
//! The scratch directory is released on every exit path because it is held
//! by a guard for the whole of `run`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::MergeConfig;
use crate::engine::{BuiltinEngine, EngineKind, MagickEngine, RasterEngine, RunningChildren};
use crate::error::{MergeError, MergeResult, Stage};
use crate::grid::{GridPlan, GridReconstructor};
use crate::locator::TileLocator;
use crate::placeholder::Placeholder;
use crate::scratch::{scratch_path, ScratchDir};

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Pyramid depth that was reconstructed.
    pub depth: u32,
    /// Tiles per side of the grid.
    pub width: u32,
    /// Real tiles found at that depth.
    pub tiles_found: usize,
    /// Grid cells filled with the placeholder.
    pub placeholders_used: u64,
    /// Where the image was written.
    pub output: PathBuf,
}

/// Runs merges with one configuration and engine.
pub struct Merger {
    config: MergeConfig,
    engine: Arc<dyn RasterEngine>,
    children: RunningChildren,
}

impl Merger {
    /// Create a merger with the engine selected in `config`.
    ///
    /// For ImageMagick this checks up front that the executable can be run.
    pub fn new(config: MergeConfig) -> MergeResult<Self> {
        config.validate()?;
        let children = RunningChildren::new();
        let engine = build_engine(&config, &children)?;
        Ok(Self {
            config,
            engine,
            children,
        })
    }

    /// Create a merger around an existing engine.
    pub fn with_engine(config: MergeConfig, engine: Arc<dyn RasterEngine>) -> MergeResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            engine,
            children: RunningChildren::new(),
        })
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// External engine processes currently running for this merger.
    ///
    /// Interrupt handlers kill these before removing the scratch directory.
    pub fn running_children(&self) -> RunningChildren {
        self.children.clone()
    }

    /// Scratch directory this merger uses while running.
    pub fn scratch_path(&self) -> PathBuf {
        scratch_path(self.config.temp_dir())
    }

    /// Merge the pyramid at `input` into one image at `output`.
    ///
    /// `.png` is appended to `output` unless it already ends in it.
    pub fn run(&self, input: &Path, output: &Path) -> MergeResult<MergeReport> {
        let started = Instant::now();
        let output = normalize_output_path(output);
        let engine = self.engine.as_ref();

        let scratch = ScratchDir::acquire(self.config.temp_dir())?;

        let tiles = TileLocator::new(self.config.tile_extension())
            .with_depth(self.config.depth())
            .locate(input)?;
        let sample = tiles.sample().ok_or_else(|| MergeError::NoTilesFound {
            root: input.to_path_buf(),
            depth: self.config.depth(),
        })?;

        let placeholder = Placeholder::materialize(engine, sample, &scratch.placeholder_path())?;
        let plan = GridPlan::new(&tiles);

        info!(
            rows = plan.width(),
            tile_size = %placeholder.size(),
            missing = plan.placeholder_count(),
            "Starting merge"
        );

        let merged = scratch.file("out.png");
        GridReconstructor::new(engine, self.config.workers()).reconstruct(
            &plan,
            placeholder.path(),
            &scratch,
            &merged,
        )?;

        let finished = self.config.post_process().apply(engine, &merged, &scratch)?;
        move_output(&finished, &output)?;

        info!(
            output = %output.display(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "All done"
        );

        Ok(MergeReport {
            depth: plan.depth(),
            width: plan.width(),
            tiles_found: tiles.len(),
            placeholders_used: plan.placeholder_count(),
            output,
        })
    }
}

fn build_engine(
    config: &MergeConfig,
    children: &RunningChildren,
) -> MergeResult<Arc<dyn RasterEngine>> {
    match config.engine() {
        EngineKind::Magick => {
            let engine = MagickEngine::new(config.executable())
                .with_memory_limit_gb(config.memory_limit_gb())
                .with_monitor(config.verbose())
                .with_timeout(config.timeout())
                .with_temp_dir(scratch_path(config.temp_dir()))
                .with_children(children.clone());
            engine
                .check_available()
                .map_err(|source| MergeError::engine(Stage::Identify, source))?;
            Ok(Arc::new(engine))
        }
        EngineKind::Builtin => Ok(Arc::new(BuiltinEngine::new())),
    }
}

/// Append `.png` unless the file name already ends in it (any case).
pub fn normalize_output_path(output: &Path) -> PathBuf {
    let has_png = output
        .file_name()
        .map(|name| name.to_string_lossy().to_ascii_lowercase().ends_with(".png"))
        .unwrap_or(false);

    if has_png {
        return output.to_path_buf();
    }

    let mut name = output.as_os_str().to_owned();
    name.push(".png");
    PathBuf::from(name)
}

/// Move the finished image into place.
///
/// Falls back to copy and delete only when the destination is on another
/// filesystem. Any other rename error is reported as is.
pub fn move_output(from: &Path, to: &Path) -> MergeResult<()> {
    let write_err = |source: io::Error| MergeError::OutputWriteFailure {
        path: to.to_path_buf(),
        source,
    };

    if let Some(parent) = to.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
    }

    match fs::rename(from, to) {
        Ok(()) => {
            debug!(from = %from.display(), to = %to.display(), "Output renamed into place");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            warn!(to = %to.display(), "Output is on another filesystem, copying it instead");
            copy_then_remove(from, to).map_err(write_err)
        }
        Err(e) => Err(write_err(e)),
    }
}

/// Copy `from` to `to`, then delete `from`.
///
/// A failed copy removes whatever part of `to` was written.
fn copy_then_remove(from: &Path, to: &Path) -> io::Result<()> {
    if let Err(e) = fs::copy(from, to) {
        if let Err(cleanup) = fs::remove_file(to) {
            if cleanup.kind() != io::ErrorKind::NotFound {
                warn!(path = %to.display(), error = %cleanup, "Failed to remove partial output");
            }
        }
        return Err(e);
    }
    fs::remove_file(from)
}
