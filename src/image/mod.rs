//! Raster buffers and views.
//!
//! `RasterImage` is the externally produced pixel buffer: any supported bit
//! depth, rows padded to a 4-byte boundary, stored top-down or bottom-up.
//! `RgbView` is a borrowed view into a packed three-channel buffer, the only
//! layout the scorer reads. The stride counts bytes between row starts, so a
//! stride larger than `3 * width` represents a sub-region of a wider buffer.

use crate::util::{ScanMatchError, ScanMatchResult};

pub mod integral;
#[cfg(feature = "image-io")]
pub mod io;
pub mod normalize;

/// Channels per pixel in normalized buffers.
pub const CHANNELS: usize = 3;

const SUPPORTED_BITS: [u16; 6] = [1, 4, 8, 16, 24, 32];

/// Vertical row order of a raster's pixel buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    /// First stored row is the top of the image.
    #[default]
    TopDown,
    /// First stored row is the bottom of the image (classic BMP layout).
    BottomUp,
}

/// Returns the unpadded number of bytes needed for one row.
pub fn row_bytes(width: usize, bits_per_pixel: u16) -> ScanMatchResult<usize> {
    width
        .checked_mul(bits_per_pixel as usize)
        .map(|bits| bits.div_ceil(8))
        .ok_or(ScanMatchError::InvalidDimensions { width, height: 0 })
}

/// Returns the row stride in bytes, padded to a 4-byte boundary.
pub fn padded_stride(width: usize, bits_per_pixel: u16) -> ScanMatchResult<usize> {
    if !SUPPORTED_BITS.contains(&bits_per_pixel) {
        return Err(ScanMatchError::UnsupportedBitDepth {
            bits: bits_per_pixel,
        });
    }
    let bytes = row_bytes(width, bits_per_pixel)?;
    Ok(bytes.div_ceil(4) * 4)
}

/// Owned raster as produced by a capture or decode collaborator.
///
/// Invariant: `data.len() == stride * height`.
#[derive(Clone, Debug)]
pub struct RasterImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
    bits_per_pixel: u16,
    stride: usize,
    orientation: Orientation,
}

impl RasterImage {
    /// Creates a raster from a padded pixel buffer.
    pub fn new(
        data: Vec<u8>,
        width: usize,
        height: usize,
        bits_per_pixel: u16,
        stride: usize,
        orientation: Orientation,
    ) -> ScanMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(ScanMatchError::InvalidDimensions { width, height });
        }
        let min_stride = padded_stride(width, bits_per_pixel)?;
        if stride < min_stride || stride % 4 != 0 {
            return Err(ScanMatchError::InvalidStride { stride, min_stride });
        }
        let expected = stride
            .checked_mul(height)
            .ok_or(ScanMatchError::InvalidDimensions { width, height })?;
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
            bits_per_pixel,
            stride,
            orientation,
        })
    }

    /// Creates a raster from unpadded rows, inserting the 4-byte row padding.
    pub fn from_packed(
        packed: &[u8],
        width: usize,
        height: usize,
        bits_per_pixel: u16,
        orientation: Orientation,
    ) -> ScanMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(ScanMatchError::InvalidDimensions { width, height });
        }
        let stride = padded_stride(width, bits_per_pixel)?;
        let tight = row_bytes(width, bits_per_pixel)?;
        let expected = tight
            .checked_mul(height)
            .ok_or(ScanMatchError::InvalidDimensions { width, height })?;
        if packed.len() != expected {
            return Err(ScanMatchError::BufferSizeMismatch {
                expected,
                got: packed.len(),
            });
        }
        let mut data = vec![0u8; stride * height];
        for (dst, src) in data.chunks_exact_mut(stride).zip(packed.chunks_exact(tight)) {
            dst[..tight].copy_from_slice(src);
        }
        Self::new(data, width, height, bits_per_pixel, stride, orientation)
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the bit depth.
    pub fn bits_per_pixel(&self) -> u16 {
        self.bits_per_pixel
    }

    /// Returns the padded row stride in bytes.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the stored row order.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Returns the backing buffer including row padding.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Borrowed view into a packed three-channel buffer with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct RgbView<'a> {
    pub(crate) data: &'a [u8],
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) stride: usize,
}

impl<'a> RgbView<'a> {
    /// Creates a view with an explicit byte stride.
    pub fn new(data: &'a [u8], width: usize, height: usize, stride: usize) -> ScanMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(ScanMatchError::InvalidDimensions { width, height });
        }
        let min_stride = width
            .checked_mul(CHANNELS)
            .ok_or(ScanMatchError::InvalidDimensions { width, height })?;
        if stride < min_stride {
            return Err(ScanMatchError::InvalidStride { stride, min_stride });
        }
        let needed = (height - 1)
            .checked_mul(stride)
            .and_then(|v| v.checked_add(min_stride))
            .ok_or(ScanMatchError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(ScanMatchError::BufferSizeMismatch {
                expected: needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Creates a contiguous view with `stride == 3 * width`.
    pub fn from_slice(data: &'a [u8], width: usize, height: usize) -> ScanMatchResult<Self> {
        Self::new(data, width, height, width.saturating_mul(CHANNELS))
    }

    /// Returns the width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in bytes between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the channel bytes of row `y`.
    pub fn row(&self, y: usize) -> Option<&'a [u8]> {
        self.span(0, y, self.width)
    }

    /// Returns the channel bytes of `len` pixels starting at `(x, y)`.
    pub fn span(&self, x: usize, y: usize, len: usize) -> Option<&'a [u8]> {
        if y >= self.height || x.checked_add(len)? > self.width {
            return None;
        }
        let start = y.checked_mul(self.stride)?.checked_add(x * CHANNELS)?;
        self.data.get(start..start + len * CHANNELS)
    }

    /// Returns the three channel bytes of the pixel at `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; CHANNELS]> {
        let px = self.span(x, y, 1)?;
        Some([px[0], px[1], px[2]])
    }
}
