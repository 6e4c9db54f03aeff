//! Integral image of per-pixel channel energy.
//!
//! Entry `(x, y)` holds the sum over all pixels above and left of `(x, y)` of
//! `r^2 + g^2 + b^2`. Row 0 and column 0 are zero, so any rectangle sum is
//! four lookups.

use crate::image::RgbView;
use crate::util::{ScanMatchError, ScanMatchResult};

/// `(H + 1) x (W + 1)` prefix-sum table of squared channel values.
#[derive(Clone, Debug)]
pub struct IntegralImage {
    table: Vec<u64>,
    width: usize,
    height: usize,
}

impl IntegralImage {
    /// Builds the table in a single pass over `view`.
    pub fn build(view: RgbView<'_>) -> ScanMatchResult<Self> {
        let width = view.width();
        let height = view.height();
        let cols = width + 1;
        let len = cols
            .checked_mul(height + 1)
            .ok_or(ScanMatchError::InvalidDimensions { width, height })?;
        let mut table = vec![0u64; len];

        for y in 0..height {
            let row = view
                .row(y)
                .ok_or(ScanMatchError::InvalidDimensions { width, height })?;
            let mut running = 0u64;
            let above = y * cols;
            let here = (y + 1) * cols;
            for (x, px) in row.chunks_exact(3).enumerate() {
                running += px.iter().map(|&c| u64::from(c) * u64::from(c)).sum::<u64>();
                table[here + x + 1] = table[above + x + 1] + running;
            }
        }

        Ok(Self {
            table,
            width,
            height,
        })
    }

    /// Returns the width of the source raster.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height of the source raster.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the sum of squared channel values over a rectangle.
    ///
    /// The rectangle must lie inside the source raster.
    #[inline]
    pub fn rect_sum_sq(&self, x: usize, y: usize, width: usize, height: usize) -> u64 {
        debug_assert!(x + width <= self.width && y + height <= self.height);
        let cols = self.width + 1;
        let top = y * cols;
        let bottom = (y + height) * cols;
        self.table[bottom + x + width] + self.table[top + x]
            - self.table[top + x + width]
            - self.table[bottom + x]
    }
}
