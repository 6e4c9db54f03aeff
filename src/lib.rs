//! ScanMatch locates a small template raster inside a larger scan raster.
//!
//! The scan is split into overlapping chunks sized relative to the template,
//! the chunks are dealt to an elastic worker pool, and every worker scores
//! template placements with an early-abort MSE or normalized SSD metric. The
//! first accepted window wins; a search without a match ends with `NoMatch`
//! once its timeout elapses. Optional features add rayon-parallel
//! partitioning (`rayon`), `wide` row kernels (`simd`), image file loading
//! (`image-io`) and `tracing` events.

pub mod image;
pub mod kernel;
pub mod lowlevel;
pub mod partition;
pub mod pool;
pub mod search;
pub mod template;
mod trace;
pub mod util;

pub use image::normalize::NormalizedRaster;
pub use image::{Orientation, RasterImage, RgbView};
pub use kernel::Metric;
pub use partition::distribute::{AlternatingEnds, ChunkDistributor, Striped};
pub use pool::{PoolConfig, PoolStats, Task, TaskOutcome, WorkerPool, WorkerState};
pub use search::{
    find_template_sequential, CancelToken, FindConfig, MatchResult, Matcher, MatcherConfig,
};
pub use util::{ScanMatchError, ScanMatchResult};
