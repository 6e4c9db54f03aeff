//! Error types for scanmatch.

use std::time::Duration;
use thiserror::Error;

/// Result alias for scanmatch operations.
pub type ScanMatchResult<T> = std::result::Result<T, ScanMatchError>;

/// Errors that can occur when preparing rasters or running a search.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ScanMatchError {
    /// The template does not fit inside the scan.
    #[error(
        "template {template_width}x{template_height} exceeds scan {scan_width}x{scan_height}"
    )]
    Dimension {
        template_width: usize,
        template_height: usize,
        scan_width: usize,
        scan_height: usize,
    },
    /// No window scored within the threshold before the timeout elapsed.
    #[error("no match found within {timeout:?}")]
    NoMatch { timeout: Duration },
    /// The threshold is negative, infinite or NaN.
    #[error("invalid threshold: {threshold}")]
    InvalidThreshold { threshold: f64 },
    /// Width or height is zero or overflows the addressable range.
    #[error("invalid dimensions: width={width}, height={height}")]
    InvalidDimensions { width: usize, height: usize },
    /// The bit depth is not one of 1, 4, 8, 16, 24 or 32.
    #[error("unsupported bit depth: {bits}")]
    UnsupportedBitDepth { bits: u16 },
    /// The row stride is too small or not 4-byte aligned.
    #[error("invalid stride {stride} (minimum {min_stride}, must be 4-byte aligned)")]
    InvalidStride { stride: usize, min_stride: usize },
    /// The pixel buffer length does not equal `stride * height`.
    #[error("pixel buffer size mismatch: expected {expected}, got {got}")]
    BufferSizeMismatch { expected: usize, got: usize },
    /// A pool task failed; absorbed at the worker boundary.
    #[error("task {task_id} failed: {reason}")]
    TaskFailed { task_id: u64, reason: String },
    /// Image decoding failed (feature `image-io`).
    #[error("image I/O error: {reason}")]
    ImageIo { reason: String },
}
