//! Raster engine boundary.
//!
//! Pixel work is never done by the merge logic itself. It asks a
//! [`RasterEngine`] for six opaque operations and only passes file paths
//! around:
//!
//! | Operation | ImageMagick equivalent |
//! |-----------|------------------------|
//! | [`dimensions`](RasterEngine::dimensions) | `convert img -format %wx%h info:` |
//! | [`blank`](RasterEngine::blank) | `convert -size WxH xc:none out` |
//! | [`append_horizontal`](RasterEngine::append_horizontal) | `convert a b c +append out` |
//! | [`append_vertical`](RasterEngine::append_vertical) | `convert a b c -append out` |
//! | [`trim`](RasterEngine::trim) | `convert img -fuzz N% -trim +repage out` |
//! | [`resize`](RasterEngine::resize) | `convert img -resize N% out` |
//!
//! # Implementors
//!
//! - [`MagickEngine`] - runs the ImageMagick `convert` executable
//! - [`BuiltinEngine`] - in-process implementation on the `image` crate

mod builtin;
mod magick;
mod process;

#[cfg(test)]
pub(crate) mod mock;

pub use builtin::BuiltinEngine;
pub use magick::{MagickEngine, DEFAULT_EXECUTABLE};
pub use process::{
    run_checked, run_checked_with, run_with_options, run_with_timeout, RunOptions,
    RunningChildren, StderrMode,
};

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Pixel size of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Errors reported by a raster engine.
///
/// Messages from an external engine are kept verbatim.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine executable could not be started.
    #[error("'{program}' could not be started: {source}")]
    Spawn { program: String, source: io::Error },

    /// The engine ran but reported failure.
    #[error("engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// The engine did not finish in time and was killed.
    #[error("engine timed out after {timeout:?}")]
    TimedOut { timeout: Duration },

    /// The engine produced output that could not be interpreted.
    #[error("unexpected engine output: {0}")]
    UnexpectedOutput(String),

    /// An operation was called with an empty image list.
    #[error("no input images given")]
    NoInputs,

    /// In-process image decoding or encoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error while talking to the engine.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Trait for raster compositing backends.
///
/// Implementations must be thread-safe (`Send + Sync`) because rows may be
/// composed concurrently.
pub trait RasterEngine: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Pixel width and height of `image`.
    fn dimensions(&self, image: &Path) -> Result<Dimensions, EngineError>;

    /// Write a fully transparent image of `size` to `output`.
    fn blank(&self, size: Dimensions, output: &Path) -> Result<(), EngineError>;

    /// Concatenate `inputs` left to right into `output`.
    fn append_horizontal(&self, inputs: &[PathBuf], output: &Path) -> Result<(), EngineError>;

    /// Stack `inputs` top to bottom into `output`.
    fn append_vertical(&self, inputs: &[PathBuf], output: &Path) -> Result<(), EngineError>;

    /// Remove a uniform border; pixels within `fuzz_percent` of the border
    /// colour count as border.
    fn trim(&self, input: &Path, fuzz_percent: u8, output: &Path) -> Result<(), EngineError>;

    /// Scale both dimensions to `percent` of the original.
    fn resize(&self, input: &Path, percent: u32, output: &Path) -> Result<(), EngineError>;
}

impl<T: RasterEngine + ?Sized> RasterEngine for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn dimensions(&self, image: &Path) -> Result<Dimensions, EngineError> {
        (**self).dimensions(image)
    }

    fn blank(&self, size: Dimensions, output: &Path) -> Result<(), EngineError> {
        (**self).blank(size, output)
    }

    fn append_horizontal(&self, inputs: &[PathBuf], output: &Path) -> Result<(), EngineError> {
        (**self).append_horizontal(inputs, output)
    }

    fn append_vertical(&self, inputs: &[PathBuf], output: &Path) -> Result<(), EngineError> {
        (**self).append_vertical(inputs, output)
    }

    fn trim(&self, input: &Path, fuzz_percent: u8, output: &Path) -> Result<(), EngineError> {
        (**self).trim(input, fuzz_percent, output)
    }

    fn resize(&self, input: &Path, percent: u32, output: &Path) -> Result<(), EngineError> {
        (**self).resize(input, percent, output)
    }
}

/// Which engine implementation a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    /// ImageMagick `convert` subprocess.
    #[default]
    Magick,
    /// In-process `image` crate backend.
    Builtin,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Magick => "magick",
            EngineKind::Builtin => "builtin",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "magick" | "imagemagick" => Ok(EngineKind::Magick),
            "builtin" => Ok(EngineKind::Builtin),
            other => Err(format!(
                "unknown engine '{}' (must be 'magick' or 'builtin')",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_display_matches_magick_geometry() {
        assert_eq!(Dimensions::new(256, 384).to_string(), "256x384");
    }

    #[test]
    fn test_engine_kind_parse() {
        assert_eq!("magick".parse::<EngineKind>(), Ok(EngineKind::Magick));
        assert_eq!("ImageMagick".parse::<EngineKind>(), Ok(EngineKind::Magick));
        assert_eq!(" builtin ".parse::<EngineKind>(), Ok(EngineKind::Builtin));
        assert!("gimp".parse::<EngineKind>().is_err());
    }

    #[test]
    fn test_engine_kind_display_roundtrip() {
        for kind in [EngineKind::Magick, EngineKind::Builtin] {
            assert_eq!(kind.to_string().parse::<EngineKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_failed_error_keeps_engine_output_verbatim() {
        let err = EngineError::Failed {
            status: "exit status: 1".to_string(),
            stderr: "convert: unable to open image `0/1.png'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "engine exited with exit status: 1: convert: unable to open image `0/1.png'"
        );
    }

    #[test]
    fn test_trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn RasterEngine>();
    }

    #[test]
    fn test_arc_forwards_to_inner_engine() {
        let engine: Arc<dyn RasterEngine> = Arc::new(BuiltinEngine::new());
        assert_eq!(RasterEngine::name(&engine), "builtin");
    }
}
