//! SIMD-accelerated row kernel using the `wide` crate.
//!
//! Channel bytes are widened to `f32x8` and squared differences accumulate
//! per lane. A lane holds at most `FLUSH_VECTORS` terms of at most `255^2`
//! before it is flushed into the `u64` total, which keeps every partial sum
//! below `2^24` and the result exact.

use crate::kernel::RowKernel;
use wide::f32x8;

const LANES: usize = 8;
const FLUSH_VECTORS: usize = 256;

/// Load 8 u8 values and convert to f32x8.
#[inline]
fn load_u8x8_as_f32x8(slice: &[u8]) -> f32x8 {
    f32x8::from([
        slice[0] as f32,
        slice[1] as f32,
        slice[2] as f32,
        slice[3] as f32,
        slice[4] as f32,
        slice[5] as f32,
        slice[6] as f32,
        slice[7] as f32,
    ])
}

/// Horizontal sum of f32x8 into an exact integer.
#[inline]
fn hsum_u64(v: f32x8) -> u64 {
    v.to_array().iter().map(|&lane| lane as u64).sum()
}

/// SIMD sum-of-squared-differences row kernel.
pub struct SsdRowSimd;

impl RowKernel for SsdRowSimd {
    fn row_ssd(a: &[u8], b: &[u8]) -> u64 {
        debug_assert_eq!(a.len(), b.len());
        let len = a.len().min(b.len());
        let simd_end = len / LANES * LANES;

        let mut total = 0u64;
        let mut acc = f32x8::ZERO;
        let mut pending = 0usize;

        let mut i = 0;
        while i < simd_end {
            let diff = load_u8x8_as_f32x8(&a[i..]) - load_u8x8_as_f32x8(&b[i..]);
            acc += diff * diff;
            pending += 1;
            if pending == FLUSH_VECTORS {
                total += hsum_u64(acc);
                acc = f32x8::ZERO;
                pending = 0;
            }
            i += LANES;
        }
        total += hsum_u64(acc);

        // Scalar remainder
        while i < len {
            let diff = i32::from(a[i]) - i32::from(b[i]);
            total += (diff * diff) as u64;
            i += 1;
        }
        total
    }
}
