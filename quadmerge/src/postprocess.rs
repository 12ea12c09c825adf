//! Optional crop and resize of the merged image.
//!
//! Crop runs before resize so the resize touches fewer pixels. Each step
//! writes a new file in the scratch directory and the last file produced is
//! the one that gets moved to the destination.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::engine::RasterEngine;
use crate::error::{MergeError, MergeResult, Stage};
use crate::scratch::ScratchDir;

/// Colour tolerance used when trimming borders.
pub const CROP_FUZZ_PERCENT: u8 = 80;

/// Resize percentage that leaves the image untouched.
pub const NO_RESIZE: u32 = 100;

/// Which post-processing steps to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostProcess {
    pub crop: bool,
    pub resize_percent: u32,
}

impl Default for PostProcess {
    fn default() -> Self {
        Self {
            crop: false,
            resize_percent: NO_RESIZE,
        }
    }
}

impl PostProcess {
    pub fn is_noop(&self) -> bool {
        !self.crop && self.resize_percent == NO_RESIZE
    }

    /// Run the enabled steps on `image` and return the final file.
    pub fn apply(
        &self,
        engine: &dyn RasterEngine,
        image: &Path,
        scratch: &ScratchDir,
    ) -> MergeResult<PathBuf> {
        let mut current = image.to_path_buf();

        if self.crop {
            let cropped = scratch.file("out-cropped.png");
            info!(fuzz = CROP_FUZZ_PERCENT, "Cropping image");
            engine
                .trim(&current, CROP_FUZZ_PERCENT, &cropped)
                .map_err(|source| MergeError::engine(Stage::Crop, source))?;
            current = cropped;
        }

        if self.resize_percent != NO_RESIZE {
            let resized = scratch.file("out-resized.png");
            info!(
                percent = self.resize_percent,
                "Resizing image to {}% of the original size", self.resize_percent
            );
            engine
                .resize(&current, self.resize_percent, &resized)
                .map_err(|source| MergeError::engine(Stage::Resize, source))?;
            current = resized;
        }

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::{Call, RecordingEngine};
    use tempfile::TempDir;

    fn setup() -> (TempDir, ScratchDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let scratch = ScratchDir::acquire(temp.path()).unwrap();
        let out = scratch.file("out.png");
        std::fs::write(&out, b"merged").unwrap();
        (temp, scratch, out)
    }

    #[test]
    fn test_noop_returns_input() {
        let (_temp, scratch, out) = setup();
        let engine = RecordingEngine::new();

        let result = PostProcess::default().apply(&engine, &out, &scratch).unwrap();

        assert!(PostProcess::default().is_noop());
        assert_eq!(result, out);
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn test_crop_then_resize_order() {
        let (_temp, scratch, out) = setup();
        let engine = RecordingEngine::new();
        let steps = PostProcess {
            crop: true,
            resize_percent: 50,
        };

        let result = steps.apply(&engine, &out, &scratch).unwrap();

        let cropped = scratch.file("out-cropped.png");
        let resized = scratch.file("out-resized.png");
        assert_eq!(
            engine.calls(),
            vec![
                Call::Trim(out, 80, cropped.clone()),
                Call::Resize(cropped, 50, resized.clone()),
            ]
        );
        assert_eq!(result, resized);
    }

    #[test]
    fn test_resize_only_reads_merged_image() {
        let (_temp, scratch, out) = setup();
        let engine = RecordingEngine::new();
        let steps = PostProcess {
            crop: false,
            resize_percent: 25,
        };

        steps.apply(&engine, &out, &scratch).unwrap();

        assert_eq!(
            engine.calls(),
            vec![Call::Resize(out, 25, scratch.file("out-resized.png"))]
        );
    }

    #[test]
    fn test_crop_failure_reports_crop_stage() {
        let (_temp, scratch, out) = setup();
        let engine = RecordingEngine::new().failing_when(|c| matches!(c, Call::Trim(..)));
        let steps = PostProcess {
            crop: true,
            resize_percent: 50,
        };

        let err = steps.apply(&engine, &out, &scratch).unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Crop));
        assert_eq!(engine.calls().len(), 1);
    }

    #[test]
    fn test_resize_failure_reports_resize_stage() {
        let (_temp, scratch, out) = setup();
        let engine = RecordingEngine::new().failing_when(|c| matches!(c, Call::Resize(..)));
        let steps = PostProcess {
            crop: false,
            resize_percent: 200,
        };

        let err = steps.apply(&engine, &out, &scratch).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Resize));
    }
}
