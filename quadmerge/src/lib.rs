//! Quadmerge - flatten quadtree tile pyramids into a single image
//!
//! Map renderers store a zoomable map as nested directories where every level
//! holds up to four children named `0`..`3`, one per quadrant of the parent.
//! This library walks such a pyramid, maps each tile's directory path to its
//! position in a flat `2^depth × 2^depth` grid and drives an external raster
//! engine to stitch rows and then the full image.
//!
//! # Pipeline
//!
//! ```text
//! locator ──► quadtree ──► grid ──► postprocess ──► output file
//!   (depth,     (cell →     (rows,     (crop,
//!    tiles)      path)       merge)     resize)
//!                  ▲
//!             placeholder
//! ```
//!
//! All pixel work goes through the [`engine::RasterEngine`] trait.

pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod locator;
pub mod logging;
pub mod merger;
pub mod placeholder;
pub mod postprocess;
pub mod quadtree;
pub mod scratch;

pub use config::{ConfigFile, MergeConfig};
pub use engine::{EngineKind, RasterEngine};
pub use error::{MergeError, MergeResult, Stage};
pub use merger::{MergeReport, Merger};

/// Library version, taken from the workspace manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
