//! Template plan precomputation for MSE and normalized scoring.

use crate::image::normalize::NormalizedRaster;
use crate::image::{RasterImage, RgbView, CHANNELS};
use crate::kernel::scalar::sum_sq;

/// Normalized template plus the energy terms the scorer needs.
///
/// Built once per search; shared read-only by every task.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    raster: NormalizedRaster,
    sum_sq: u64,
    row_sum_sq: Vec<u64>,
}

impl TemplatePlan {
    /// Normalizes a collaborator raster and builds the plan.
    pub fn from_raster(raster: &RasterImage) -> Self {
        Self::from_normalized(NormalizedRaster::from_raster(raster))
    }

    /// Builds a plan from an already normalized raster.
    pub fn from_normalized(raster: NormalizedRaster) -> Self {
        let row_len = raster.width() * CHANNELS;
        let row_sum_sq: Vec<u64> = raster.data().chunks_exact(row_len).map(sum_sq).collect();
        let sum_sq = row_sum_sq.iter().sum();
        Self {
            raster,
            sum_sq,
            row_sum_sq,
        }
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.raster.width()
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.raster.height()
    }

    /// Returns the number of compared channel values.
    pub fn sample_count(&self) -> usize {
        self.width() * self.height() * CHANNELS
    }

    /// Returns the packed channel bytes of row `y`.
    pub fn row(&self, y: usize) -> &[u8] {
        let row_len = self.width() * CHANNELS;
        &self.raster.data()[y * row_len..(y + 1) * row_len]
    }

    /// Returns the sum of squared channel values over the whole template.
    pub fn sum_sq(&self) -> u64 {
        self.sum_sq
    }

    /// Returns the sum of squared channel values of row `y`.
    pub fn row_sum_sq(&self, y: usize) -> u64 {
        self.row_sum_sq[y]
    }

    /// Returns a borrowed view of the normalized template.
    pub fn view(&self) -> RgbView<'_> {
        self.raster.view()
    }
}
