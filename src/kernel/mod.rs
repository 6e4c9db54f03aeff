//! Similarity kernels and the window scorer.

/// Dissimilarity metric used to score a window against the template.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Metric {
    /// Mean squared per-channel difference over the template footprint.
    #[default]
    Mse,
    /// Sum of squared differences divided by `sqrt(template_energy * window_energy)`.
    ///
    /// Window energy comes from the scan's integral image. Thresholds are
    /// dimensionless.
    Normalized,
}

/// Kernel trait for comparing one row of channel bytes.
pub trait RowKernel {
    /// Returns the exact sum of squared differences of two equal-length spans.
    fn row_ssd(a: &[u8], b: &[u8]) -> u64;
}

pub mod scalar;
mod score;

#[cfg(feature = "simd")]
pub mod simd;

pub use score::{Decision, Scorer, ACCEPT_FRACTION, NORMALIZED_EPSILON};
