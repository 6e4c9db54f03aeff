//! Scalar reference kernels for row comparisons.

use crate::kernel::RowKernel;

/// Scalar sum-of-squared-differences row kernel.
pub struct SsdRowScalar;

impl RowKernel for SsdRowScalar {
    #[inline]
    fn row_ssd(a: &[u8], b: &[u8]) -> u64 {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b)
            .map(|(&x, &y)| {
                let diff = i32::from(x) - i32::from(y);
                (diff * diff) as u64
            })
            .sum()
    }
}

/// Sum of squared channel values.
pub(crate) fn sum_sq(values: &[u8]) -> u64 {
    values.iter().map(|&v| u64::from(v) * u64::from(v)).sum()
}
