//! Window scoring with early abort and the accept/verify/reject policy.
//!
//! Both metrics accumulate the squared-difference sum one template row at a
//! time and stop as soon as the partial sum exceeds `bound * denominator`.
//! The partial sum only grows, so an aborted window could never have scored
//! within the bound.

use crate::image::integral::IntegralImage;
use crate::image::RgbView;
use crate::kernel::scalar::SsdRowScalar;
use crate::kernel::{Metric, RowKernel};
use crate::template::TemplatePlan;

#[cfg(not(feature = "simd"))]
use crate::kernel::scalar::SsdRowScalar as SsdRow;
#[cfg(feature = "simd")]
use crate::kernel::simd::SsdRowSimd as SsdRow;

/// Scores at or below `threshold * ACCEPT_FRACTION` are accepted outright.
pub const ACCEPT_FRACTION: f64 = 0.2;

/// Normalized denominators below this value score as the worst match.
pub const NORMALIZED_EPSILON: f64 = 1e-6;

/// Outcome of evaluating one window against the threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Decision {
    /// Score within `threshold * ACCEPT_FRACTION`.
    Accept { score: f64 },
    /// Score within the threshold, confirmed by a full recomputation.
    AcceptVerified { score: f64 },
    /// Score above the threshold.
    Reject,
}

impl Decision {
    /// Returns true for either accept variant.
    pub fn is_accept(&self) -> bool {
        !matches!(self, Decision::Reject)
    }
}

/// Scores template placements inside a view of the scan.
///
/// Coordinates passed to the scoring methods are relative to the view;
/// `origin` is the view's top-left corner in scan coordinates and is only
/// used for integral image lookups.
#[derive(Clone, Copy)]
pub struct Scorer<'a> {
    plan: &'a TemplatePlan,
    integral: Option<&'a IntegralImage>,
    metric: Metric,
    threshold: f64,
}

impl<'a> Scorer<'a> {
    /// Creates a plain MSE scorer.
    pub fn mse(plan: &'a TemplatePlan, threshold: f64) -> Self {
        Self {
            plan,
            integral: None,
            metric: Metric::Mse,
            threshold,
        }
    }

    /// Creates a normalized scorer backed by the scan's integral image.
    pub fn normalized(plan: &'a TemplatePlan, integral: &'a IntegralImage, threshold: f64) -> Self {
        Self {
            plan,
            integral: Some(integral),
            metric: Metric::Normalized,
            threshold,
        }
    }

    /// Returns the metric in use.
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Returns the acceptance threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Computes the full score of the placement at `(x, y)`.
    ///
    /// Returns `f64::INFINITY` for a near-uniform normalized window or a
    /// placement that leaves the view.
    pub fn score(&self, view: RgbView<'_>, x: usize, y: usize, origin: (usize, usize)) -> f64 {
        self.score_bounded(view, x, y, origin, f64::INFINITY)
            .unwrap_or(f64::INFINITY)
    }

    /// Computes the score, aborting once it must exceed `bound`.
    ///
    /// Returns `None` if the score exceeds `bound` or the placement leaves
    /// the view.
    pub fn score_bounded(
        &self,
        view: RgbView<'_>,
        x: usize,
        y: usize,
        origin: (usize, usize),
        bound: f64,
    ) -> Option<f64> {
        if !self.fits(view, x, y) {
            return None;
        }
        let Some(denom) = self.denominator(x, y, origin) else {
            return bound.is_infinite().then_some(f64::INFINITY);
        };

        let limit = bound * denom;
        let mut ssd = 0u64;
        for ty in 0..self.plan.height() {
            let window_row = view.span(x, y + ty, self.plan.width())?;
            ssd += SsdRow::row_ssd(window_row, self.plan.row(ty));
            if ssd as f64 > limit {
                return None;
            }
        }
        Some(ssd as f64 / denom)
    }

    /// Applies the decision policy to the placement at `(x, y)`.
    ///
    /// Scores in `(threshold * ACCEPT_FRACTION, threshold]` are recomputed
    /// over the whole footprint with the scalar reference kernel and must
    /// still be within the threshold.
    pub fn evaluate(&self, view: RgbView<'_>, x: usize, y: usize, origin: (usize, usize)) -> Decision {
        let Some(score) = self.score_bounded(view, x, y, origin, self.threshold) else {
            return Decision::Reject;
        };
        if score <= self.threshold * ACCEPT_FRACTION {
            return Decision::Accept { score };
        }
        match self.recompute(view, x, y, origin) {
            Some(full) if full <= self.threshold => Decision::AcceptVerified { score: full },
            _ => Decision::Reject,
        }
    }

    fn fits(&self, view: RgbView<'_>, x: usize, y: usize) -> bool {
        x + self.plan.width() <= view.width() && y + self.plan.height() <= view.height()
    }

    /// Returns the score divisor, or `None` for a near-uniform normalized window.
    fn denominator(&self, x: usize, y: usize, origin: (usize, usize)) -> Option<f64> {
        match self.metric {
            Metric::Mse => Some(self.plan.sample_count() as f64),
            Metric::Normalized => {
                let integral = self.integral?;
                let window_sq = integral.rect_sum_sq(
                    origin.0 + x,
                    origin.1 + y,
                    self.plan.width(),
                    self.plan.height(),
                );
                let denom = (self.plan.sum_sq() as f64 * window_sq as f64).sqrt();
                (denom >= NORMALIZED_EPSILON).then_some(denom)
            }
        }
    }

    /// Full score with the scalar kernel and no early abort.
    fn recompute(&self, view: RgbView<'_>, x: usize, y: usize, origin: (usize, usize)) -> Option<f64> {
        if !self.fits(view, x, y) {
            return None;
        }
        let denom = self.denominator(x, y, origin)?;
        let mut ssd = 0u64;
        for ty in 0..self.plan.height() {
            let window_row = view.span(x, y + ty, self.plan.width())?;
            ssd += SsdRowScalar::row_ssd(window_row, self.plan.row(ty));
        }
        Some(ssd as f64 / denom)
    }
}
