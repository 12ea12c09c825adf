//! In-process raster engine on the `image` crate.
//!
//! Holds whole images in memory, so it suits small pyramids and tests. Large
//! maps should go through [`MagickEngine`](super::MagickEngine), which can
//! spill to disk.

use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use super::{Dimensions, EngineError, RasterEngine};

/// Raster engine that composites with the `image` crate.
#[derive(Debug, Clone, Default)]
pub struct BuiltinEngine;

impl BuiltinEngine {
    pub fn new() -> Self {
        Self
    }
}

impl RasterEngine for BuiltinEngine {
    fn name(&self) -> &str {
        "builtin"
    }

    fn dimensions(&self, image: &Path) -> Result<Dimensions, EngineError> {
        let (width, height) = image::image_dimensions(image)?;
        Ok(Dimensions::new(width, height))
    }

    fn blank(&self, size: Dimensions, output: &Path) -> Result<(), EngineError> {
        RgbaImage::new(size.width, size.height).save(output)?;
        Ok(())
    }

    fn append_horizontal(&self, inputs: &[PathBuf], output: &Path) -> Result<(), EngineError> {
        let images = load_all(inputs)?;
        let width = images.iter().map(|i| i.width()).sum();
        let height = images.iter().map(|i| i.height()).max().unwrap_or(0);

        let mut canvas = RgbaImage::new(width, height);
        let mut x = 0i64;
        for image in &images {
            imageops::replace(&mut canvas, image, x, 0);
            x += i64::from(image.width());
        }

        canvas.save(output)?;
        Ok(())
    }

    fn append_vertical(&self, inputs: &[PathBuf], output: &Path) -> Result<(), EngineError> {
        let images = load_all(inputs)?;
        let width = images.iter().map(|i| i.width()).max().unwrap_or(0);
        let height = images.iter().map(|i| i.height()).sum();

        let mut canvas = RgbaImage::new(width, height);
        let mut y = 0i64;
        for image in &images {
            imageops::replace(&mut canvas, image, 0, y);
            y += i64::from(image.height());
        }

        canvas.save(output)?;
        Ok(())
    }

    fn trim(&self, input: &Path, fuzz_percent: u8, output: &Path) -> Result<(), EngineError> {
        let image = image::open(input)?.to_rgba8();
        let trimmed = trim_border(&image, fuzz_percent);
        trimmed.save(output)?;
        Ok(())
    }

    fn resize(&self, input: &Path, percent: u32, output: &Path) -> Result<(), EngineError> {
        let image = image::open(input)?.to_rgba8();
        let width = scale(image.width(), percent);
        let height = scale(image.height(), percent);

        if (width, height) == image.dimensions() {
            image.save(output)?;
        } else {
            imageops::resize(&image, width, height, FilterType::Triangle).save(output)?;
        }
        Ok(())
    }
}

fn load_all(inputs: &[PathBuf]) -> Result<Vec<RgbaImage>, EngineError> {
    if inputs.is_empty() {
        return Err(EngineError::NoInputs);
    }
    inputs
        .iter()
        .map(|path| Ok(image::open(path)?.to_rgba8()))
        .collect()
}

/// Scale a dimension to `percent`, rounding to nearest and never below 1.
fn scale(value: u32, percent: u32) -> u32 {
    let scaled = (u64::from(value) * u64::from(percent) + 50) / 100;
    scaled.clamp(1, u64::from(u32::MAX)) as u32
}

/// Whether `pixel` matches `border` within `fuzz` (a fraction in `[0, 1]`).
///
/// Alpha is compared first and on its own, so an opaque pixel never blends
/// into a transparent border. Colour distance is then weighted by both
/// alphas, which makes all fully transparent pixels equal.
fn within_fuzz(pixel: &Rgba<u8>, border: &Rgba<u8>, fuzz: f64) -> bool {
    let alpha_p = f64::from(pixel.0[3]) / 255.0;
    let alpha_b = f64::from(border.0[3]) / 255.0;
    if (alpha_p - alpha_b).abs() > fuzz {
        return false;
    }

    let sum: f64 = pixel.0[..3]
        .iter()
        .zip(border.0[..3].iter())
        .map(|(p, b)| {
            let d = (f64::from(*p) - f64::from(*b)) / 255.0;
            d * d
        })
        .sum();
    (sum * alpha_p * alpha_b / 3.0).sqrt() <= fuzz
}

/// Crop away rows and columns whose pixels all match the top-left colour
/// within `fuzz_percent`.
///
/// An image that is border everywhere collapses to its top-left pixel.
fn trim_border(image: &RgbaImage, fuzz_percent: u8) -> RgbaImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let border = *image.get_pixel(0, 0);
    let fuzz = f64::from(fuzz_percent.min(100)) / 100.0;

    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;

    for (x, y, pixel) in image.enumerate_pixels() {
        if !within_fuzz(pixel, &border, fuzz) {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if min_x == u32::MAX {
        return imageops::crop_imm(image, 0, 0, 1, 1).to_image();
    }

    imageops::crop_imm(image, min_x, min_y, max_x - min_x + 1, max_y - min_y + 1).to_image()
}
