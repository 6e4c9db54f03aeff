//! Window scan over chunks and whole rasters.
//!
//! Windows are visited row-major: every placement of row `y` before row
//! `y + 1`. The halt conditions are polled before each row and before each
//! window.

use crate::image::integral::IntegralImage;
use crate::image::normalize::NormalizedRaster;
use crate::image::{RasterImage, RgbView};
use crate::kernel::{Decision, Metric, Scorer};
use crate::search::cancel::CancelToken;
use crate::search::{check_threshold, MatchResult};
use crate::template::TemplatePlan;
use crate::trace::{trace_event, trace_span};
use crate::util::{ScanMatchError, ScanMatchResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Accepted window in scan coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Hit {
    pub(crate) x: usize,
    pub(crate) y: usize,
    pub(crate) score: f64,
}

/// Halt conditions shared by the tasks of one search.
#[derive(Clone, Copy, Default)]
pub(crate) struct Halt<'a> {
    found: Option<&'a AtomicBool>,
    token: Option<&'a CancelToken>,
}

impl<'a> Halt<'a> {
    pub(crate) fn new(found: &'a AtomicBool, token: &'a CancelToken) -> Self {
        Self {
            found: Some(found),
            token: Some(token),
        }
    }

    fn found(&self) -> bool {
        self.found.is_some_and(|f| f.load(Ordering::Acquire))
    }

    /// Row and chunk boundary check; reads the clock.
    pub(crate) fn at_row(&self) -> bool {
        self.found() || self.token.is_some_and(CancelToken::expired)
    }

    /// Per-window check; flags only.
    #[inline]
    fn at_window(&self) -> bool {
        self.found() || self.token.is_some_and(CancelToken::is_cancelled)
    }
}

/// Scans every placement of the template inside `view`.
///
/// `origin` is the view's top-left corner in scan coordinates; the returned
/// hit is translated by it.
pub(crate) fn scan_view(
    view: RgbView<'_>,
    origin: (usize, usize),
    scorer: &Scorer<'_>,
    tpl_width: usize,
    tpl_height: usize,
    halt: Halt<'_>,
) -> Option<Hit> {
    if view.width() < tpl_width || view.height() < tpl_height {
        return None;
    }
    let max_x = view.width() - tpl_width;
    let max_y = view.height() - tpl_height;
    for y in 0..=max_y {
        if halt.at_row() {
            return None;
        }
        for x in 0..=max_x {
            if halt.at_window() {
                return None;
            }
            let score = match scorer.evaluate(view, x, y, origin) {
                Decision::Accept { score } | Decision::AcceptVerified { score } => score,
                Decision::Reject => continue,
            };
            return Some(Hit {
                x: origin.0 + x,
                y: origin.1 + y,
                score,
            });
        }
    }
    None
}

/// Finds the first accepted window in row-major order on the calling thread.
///
/// Uses the same scorer and decision policy as `Matcher::find_template` but
/// no pool, no partitioning and no timeout. On failure returns `NoMatch` with
/// a zero timeout.
pub fn find_template_sequential(
    scan: &RasterImage,
    template: &RasterImage,
    threshold: f64,
    metric: Metric,
) -> ScanMatchResult<MatchResult> {
    check_threshold(threshold)?;
    if template.width() > scan.width() || template.height() > scan.height() {
        return Err(ScanMatchError::Dimension {
            template_width: template.width(),
            template_height: template.height(),
            scan_width: scan.width(),
            scan_height: scan.height(),
        });
    }
    let _span = trace_span!(
        "find_template_sequential",
        scan_width = scan.width(),
        scan_height = scan.height()
    )
    .entered();

    let start = Instant::now();
    let scan = NormalizedRaster::from_raster(scan);
    let plan = TemplatePlan::from_raster(template);
    let integral;
    let scorer = match metric {
        Metric::Mse => Scorer::mse(&plan, threshold),
        Metric::Normalized => {
            integral = IntegralImage::build(scan.view())?;
            Scorer::normalized(&plan, &integral, threshold)
        }
    };

    let hit = scan_view(
        scan.view(),
        (0, 0),
        &scorer,
        plan.width(),
        plan.height(),
        Halt::default(),
    );
    let elapsed = start.elapsed();
    match hit {
        Some(hit) => {
            trace_event!(
                "match_found",
                x = hit.x,
                y = hit.y,
                elapsed_ms = elapsed.as_millis() as u64
            );
            Ok(MatchResult {
                x: hit.x,
                y: hit.y,
                score: hit.score,
                elapsed,
            })
        }
        None => Err(ScanMatchError::NoMatch {
            timeout: Duration::ZERO,
        }),
    }
}
