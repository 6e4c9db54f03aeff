//! Low-level building blocks for custom search pipelines.
//!
//! These items expose normalization, integral images, partitioning and the
//! window scorer for callers that drive their own scheduling instead of the
//! high-level `Matcher`.

pub use crate::image::integral::IntegralImage;
pub use crate::image::normalize::normalize_rows;
pub use crate::image::{padded_stride, row_bytes, CHANNELS};
pub use crate::kernel::scalar::SsdRowScalar;
#[cfg(feature = "simd")]
pub use crate::kernel::simd::SsdRowSimd;
pub use crate::kernel::{Decision, RowKernel, Scorer, ACCEPT_FRACTION, NORMALIZED_EPSILON};
pub use crate::partition::{partition_scan, Chunk, ChunkLayout};
#[cfg(feature = "rayon")]
pub use crate::partition::partition_scan_par;
pub use crate::template::TemplatePlan;
