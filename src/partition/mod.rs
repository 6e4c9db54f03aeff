//! Adaptive partitioning of the scan into overlapping chunks.
//!
//! Chunk sizes scale with the scan-to-template ratio so that small templates
//! in large scans do not explode into thousands of chunks, while a template
//! that is large relative to the scan collapses the axis into one chunk.
//! Adjacent chunks overlap by at least `template - 1` pixels, so every
//! template-sized window lies entirely inside at least one chunk.

pub mod distribute;

use crate::image::normalize::NormalizedRaster;
use crate::image::{RgbView, CHANNELS};
use crate::util::math::{clamp_ratio, scale_extent};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Chunk dimensions and overlaps for one scan/template pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkLayout {
    /// Nominal chunk width before clipping at the right edge.
    pub chunk_width: usize,
    /// Nominal chunk height before clipping at the bottom edge.
    pub chunk_height: usize,
    /// Horizontal overlap between neighbouring chunks.
    pub overlap_x: usize,
    /// Vertical overlap between neighbouring chunks.
    pub overlap_y: usize,
    /// Template width the layout was computed for.
    pub tpl_width: usize,
    /// Template height the layout was computed for.
    pub tpl_height: usize,
}

impl ChunkLayout {
    /// Computes the layout for a `scan_width x scan_height` scan and a
    /// `tpl_width x tpl_height` template. Template dimensions must be non-zero.
    pub fn new(scan_width: usize, scan_height: usize, tpl_width: usize, tpl_height: usize) -> Self {
        let chunk_width = axis_chunk(scan_width, tpl_width);
        let chunk_height = axis_chunk(scan_height, tpl_height);
        Self {
            chunk_width,
            chunk_height,
            overlap_x: axis_overlap(scan_width, tpl_width, chunk_width),
            overlap_y: axis_overlap(scan_height, tpl_height, chunk_height),
            tpl_width,
            tpl_height,
        }
    }

    /// Horizontal distance between chunk origins.
    pub fn stride_x(&self) -> usize {
        self.chunk_width.saturating_sub(self.overlap_x).max(1)
    }

    /// Vertical distance between chunk origins.
    pub fn stride_y(&self) -> usize {
        self.chunk_height.saturating_sub(self.overlap_y).max(1)
    }

    fn spans(&self, scan: &NormalizedRaster) -> (Spans, Spans) {
        let x_spans = axis_spans(scan.width(), self.chunk_width, self.stride_x(), self.tpl_width);
        let y_spans = axis_spans(scan.height(), self.chunk_height, self.stride_y(), self.tpl_height);
        (x_spans, y_spans)
    }

    /// Cuts `scan` into chunks in row-major order.
    ///
    /// `scan` must have the dimensions the layout was computed for.
    pub fn partition(&self, scan: &NormalizedRaster) -> Vec<Chunk> {
        let (x_spans, y_spans) = self.spans(scan);
        y_spans
            .iter()
            .flat_map(|&band| band_chunks(scan, &x_spans, band))
            .collect()
    }

    /// Cuts `scan` into chunks with one rayon task per row band.
    ///
    /// Produces the same chunks in the same order as `partition`.
    #[cfg(feature = "rayon")]
    pub fn partition_par(&self, scan: &NormalizedRaster) -> Vec<Chunk> {
        let (x_spans, y_spans) = self.spans(scan);
        let bands: Vec<Vec<Chunk>> = y_spans
            .par_iter()
            .map(|&band| band_chunks(scan, &x_spans, band))
            .collect();
        bands.into_iter().flatten().collect()
    }
}

fn axis_chunk(len: usize, tpl: usize) -> usize {
    if len < tpl.saturating_mul(6) {
        return len;
    }
    let ratio = len as f64 / tpl as f64;
    scale_extent(tpl, clamp_ratio(ratio / 4.0, 2.0, 6.0)).min(len / 3)
}

fn axis_overlap(len: usize, tpl: usize, chunk: usize) -> usize {
    if chunk == len {
        return tpl;
    }
    let ratio = len as f64 / tpl as f64;
    let scaled = (tpl as f64 / clamp_ratio(ratio / 8.0, 1.5, f64::INFINITY)) as usize;
    scaled.max(tpl - 1)
}

type Spans = Vec<(usize, usize)>;

/// `(origin, extent)` pairs along one axis.
///
/// Trailing spans shorter than the template are dropped: they cannot hold a
/// full window.
fn axis_spans(len: usize, chunk: usize, stride: usize, tpl: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut origin = 0;
    while origin < len {
        let extent = chunk.min(len - origin);
        if extent < tpl {
            break;
        }
        spans.push((origin, extent));
        if origin + extent >= len {
            break;
        }
        origin += stride;
    }
    spans
}

/// Rectangular copy of part of the scan.
#[derive(Clone, Debug)]
pub struct Chunk {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Chunk {
    /// Returns the chunk's top-left corner in scan coordinates.
    pub fn origin(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    /// Returns the chunk width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the chunk height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns a view of the chunk's own pixel buffer.
    pub fn view(&self) -> RgbView<'_> {
        RgbView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width * CHANNELS,
        }
    }
}

fn band_chunks(
    scan: &NormalizedRaster,
    x_spans: &[(usize, usize)],
    (y, height): (usize, usize),
) -> Vec<Chunk> {
    x_spans
        .iter()
        .filter_map(|&(x, width)| {
            let data = scan.copy_region(x, y, width, height)?;
            Some(Chunk {
                x,
                y,
                width,
                height,
                data,
            })
        })
        .collect()
}

/// Splits the scan into chunks in row-major order.
///
/// Returns no chunks if the template is empty or larger than the scan.
pub fn partition_scan(scan: &NormalizedRaster, tpl_width: usize, tpl_height: usize) -> Vec<Chunk> {
    if tpl_width == 0 || tpl_height == 0 {
        return Vec::new();
    }
    ChunkLayout::new(scan.width(), scan.height(), tpl_width, tpl_height).partition(scan)
}

/// Splits the scan into chunks with one rayon task per row band.
///
/// Produces the same chunks in the same order as `partition_scan`.
#[cfg(feature = "rayon")]
pub fn partition_scan_par(scan: &NormalizedRaster, tpl_width: usize, tpl_height: usize) -> Vec<Chunk> {
    if tpl_width == 0 || tpl_height == 0 {
        return Vec::new();
    }
    ChunkLayout::new(scan.width(), scan.height(), tpl_width, tpl_height).partition_par(scan)
}
