//! Convenience helpers for loading rasters via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::{Orientation, RasterImage};
use crate::util::{ScanMatchError, ScanMatchResult};
use std::path::Path;

/// Creates a top-down 24-bit raster from an RGB image buffer.
pub fn raster_from_rgb_image(img: &image::RgbImage) -> ScanMatchResult<RasterImage> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    RasterImage::from_packed(img.as_raw(), width, height, 24, Orientation::TopDown)
}

/// Creates a top-down 24-bit raster from a dynamic image.
pub fn raster_from_dynamic_image(img: &image::DynamicImage) -> ScanMatchResult<RasterImage> {
    let rgb = img.to_rgb8();
    raster_from_rgb_image(&rgb)
}

/// Loads an image from disk and converts it to a 24-bit raster.
pub fn load_raster<P: AsRef<Path>>(path: P) -> ScanMatchResult<RasterImage> {
    let img = image::open(path).map_err(|err| ScanMatchError::ImageIo {
        reason: err.to_string(),
    })?;
    raster_from_dynamic_image(&img)
}
