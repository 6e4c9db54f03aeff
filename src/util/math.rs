//! Numeric helpers for chunk sizing and worker sizing.

/// Clamps `value` to `[lo, hi]`; `hi` may be `f64::INFINITY`.
pub(crate) fn clamp_ratio(value: f64, lo: f64, hi: f64) -> f64 {
    if value < lo {
        lo
    } else if value > hi {
        hi
    } else {
        value
    }
}

/// Multiplies a pixel extent by a real factor, truncating toward zero.
pub(crate) fn scale_extent(extent: usize, factor: f64) -> usize {
    (extent as f64 * factor) as usize
}

/// Worker count for a machine with `parallelism` hardware threads.
///
/// One thread is left for the caller blocked in the result race.
pub(crate) fn worker_count_for(parallelism: usize) -> usize {
    parallelism.saturating_sub(1).max(1)
}

/// Worker count derived from `std::thread::available_parallelism`.
pub(crate) fn default_worker_count() -> usize {
    let parallelism = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    worker_count_for(parallelism)
}
