//! Conversion of collaborator rasters into canonical scorer layout.
//!
//! Normalization has two steps. `normalize_rows` puts rows in top-down order
//! (a physical row reversal for bottom-up rasters, a borrow otherwise).
//! `NormalizedRaster::from_raster` then repacks every pixel into three bytes
//! in storage channel order with no row padding:
//!
//! - 32/24-bit: the first three bytes of each pixel.
//! - 16-bit: little-endian RGB555, each 5-bit channel expanded to 8 bits.
//! - 8/4/1-bit: the value is an intensity replicated to all channels
//!   (4-bit scaled by 17, 1-bit mapped to 0/255, MSB first). Palette lookup
//!   is the decoder's job.

use crate::image::{Orientation, RasterImage, RgbView, CHANNELS};
use crate::util::{ScanMatchError, ScanMatchResult};
use std::borrow::Cow;

/// Returns the raster's padded buffer with rows in top-down order.
pub fn normalize_rows(raster: &RasterImage) -> Cow<'_, [u8]> {
    match raster.orientation() {
        Orientation::TopDown => Cow::Borrowed(raster.data()),
        Orientation::BottomUp => {
            let stride = raster.stride();
            let mut flipped = Vec::with_capacity(raster.data().len());
            for row in raster.data().chunks_exact(stride).rev() {
                flipped.extend_from_slice(row);
            }
            Cow::Owned(flipped)
        }
    }
}

/// Top-down raster packed at three bytes per pixel.
#[derive(Clone, Debug)]
pub struct NormalizedRaster {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl NormalizedRaster {
    /// Normalizes a collaborator raster.
    pub fn from_raster(raster: &RasterImage) -> Self {
        let width = raster.width();
        let height = raster.height();
        let stride = raster.stride();
        let rows = normalize_rows(raster);

        let mut data = Vec::with_capacity(width * height * CHANNELS);
        for row in rows.chunks_exact(stride) {
            match raster.bits_per_pixel() {
                32 => {
                    for px in row.chunks_exact(4).take(width) {
                        data.extend_from_slice(&px[..CHANNELS]);
                    }
                }
                24 => data.extend_from_slice(&row[..width * CHANNELS]),
                16 => {
                    for px in row.chunks_exact(2).take(width) {
                        let v = u16::from_le_bytes([px[0], px[1]]);
                        let b = expand5((v & 0x1F) as u8);
                        let g = expand5(((v >> 5) & 0x1F) as u8);
                        let r = expand5(((v >> 10) & 0x1F) as u8);
                        data.extend_from_slice(&[b, g, r]);
                    }
                }
                8 => {
                    for &v in &row[..width] {
                        data.extend_from_slice(&[v; CHANNELS]);
                    }
                }
                4 => {
                    for x in 0..width {
                        let byte = row[x / 2];
                        let nibble = if x % 2 == 0 { byte >> 4 } else { byte & 0x0F };
                        data.extend_from_slice(&[nibble * 17; CHANNELS]);
                    }
                }
                _ => {
                    for x in 0..width {
                        let bit = (row[x / 8] >> (7 - x % 8)) & 1;
                        data.extend_from_slice(&[bit * 255; CHANNELS]);
                    }
                }
            }
        }

        Self {
            data,
            width,
            height,
        }
    }

    /// Wraps an already packed top-down buffer.
    pub fn from_packed(data: Vec<u8>, width: usize, height: usize) -> ScanMatchResult<Self> {
        RgbView::from_slice(&data, width, height)?;
        let expected = width * height * CHANNELS;
        if data.len() != expected {
            return Err(ScanMatchError::BufferSizeMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Returns the width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the packed buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a borrowed view of the whole raster.
    pub fn view(&self) -> RgbView<'_> {
        RgbView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width * CHANNELS,
        }
    }

    /// Copies a rectangular region into a new packed buffer.
    ///
    /// Returns `None` when the region is empty or leaves the raster.
    pub fn copy_region(&self, x: usize, y: usize, width: usize, height: usize) -> Option<Vec<u8>> {
        if width == 0 || height == 0 {
            return None;
        }
        if x.checked_add(width)? > self.width || y.checked_add(height)? > self.height {
            return None;
        }
        let stride = self.width * CHANNELS;
        let row_len = width * CHANNELS;
        if x == 0 && width == self.width {
            let start = y * stride;
            return Some(self.data[start..start + height * stride].to_vec());
        }
        let mut out = Vec::with_capacity(row_len * height);
        for row in y..y + height {
            let start = row * stride + x * CHANNELS;
            out.extend_from_slice(&self.data[start..start + row_len]);
        }
        Some(out)
    }
}

fn expand5(v: u8) -> u8 {
    (v << 3) | (v >> 2)
}
