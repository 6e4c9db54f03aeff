//! Match coordination: partition, distribute, score, race the timeout.
//!
//! A `Matcher` owns one normalized scan and a worker pool that survives
//! across searches. `find_template` splits the scan into overlapping chunks,
//! deals them into one group per worker, and submits one task per group.
//! The first task to accept a window claims a shared flag and publishes the
//! hit on a single-slot channel; the caller returns on that hit or when the
//! timeout elapses, whichever comes first. Which of several true matches is
//! reported depends on scheduling.

pub mod cancel;
pub(crate) mod scan;

pub use cancel::CancelToken;
pub use scan::find_template_sequential;

use crate::image::integral::IntegralImage;
use crate::image::normalize::NormalizedRaster;
use crate::image::RasterImage;
use crate::kernel::{Metric, Scorer};
use crate::partition::distribute::{AlternatingEnds, ChunkDistributor};
use crate::partition::{Chunk, ChunkLayout};
use crate::pool::{PoolConfig, Task, WorkerPool};
use crate::template::TemplatePlan;
use crate::trace::{trace_event, trace_span};
use crate::util::math::default_worker_count;
use crate::util::{ScanMatchError, ScanMatchResult};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use scan::{scan_view, Halt, Hit};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// Per-search options.
#[derive(Clone, Debug)]
pub struct FindConfig {
    /// Maximum accepted score; the scale depends on `metric`. Must be
    /// finite and non-negative.
    pub threshold: f64,
    /// How long to wait for a match.
    pub timeout: Duration,
    /// Dissimilarity metric.
    pub metric: Metric,
}

impl Default for FindConfig {
    fn default() -> Self {
        Self {
            threshold: 100.0,
            timeout: Duration::from_millis(500),
            metric: Metric::Mse,
        }
    }
}

/// Matcher construction options.
#[derive(Clone, Debug, Default)]
pub struct MatcherConfig {
    /// Initial pool configuration.
    pub pool: PoolConfig,
    /// Tasks per search; `None` uses `max(available_parallelism - 1, 1)`.
    pub worker_count: Option<usize>,
}

/// Accepted match location relative to the scan's top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchResult {
    /// Column of the template's top-left pixel.
    pub x: usize,
    /// Row of the template's top-left pixel.
    pub y: usize,
    /// Score of the accepted window.
    pub score: f64,
    /// Time from the start of the search to the result.
    pub elapsed: Duration,
}

/// Session object holding a scan and the pool that searches it.
pub struct Matcher {
    pool: WorkerPool,
    scan: NormalizedRaster,
    integral: OnceLock<Arc<IntegralImage>>,
    distributor: Arc<dyn ChunkDistributor>,
    worker_count: usize,
    next_task_id: AtomicU64,
}

impl Matcher {
    /// Creates a matcher with default configuration.
    pub fn new(scan: &RasterImage) -> Self {
        Self::with_config(scan, MatcherConfig::default())
    }

    /// Creates a matcher with explicit pool and worker settings.
    pub fn with_config(scan: &RasterImage, cfg: MatcherConfig) -> Self {
        let worker_count = cfg.worker_count.unwrap_or_else(default_worker_count).max(1);
        Self {
            pool: WorkerPool::new(cfg.pool),
            scan: NormalizedRaster::from_raster(scan),
            integral: OnceLock::new(),
            distributor: Arc::new(AlternatingEnds),
            worker_count,
            next_task_id: AtomicU64::new(0),
        }
    }

    /// Replaces the chunk distribution strategy.
    pub fn with_distributor<D>(mut self, distributor: D) -> Self
    where
        D: ChunkDistributor + 'static,
    {
        self.distributor = Arc::new(distributor);
        self
    }

    /// Returns the scan width in pixels.
    pub fn scan_width(&self) -> usize {
        self.scan.width()
    }

    /// Returns the scan height in pixels.
    pub fn scan_height(&self) -> usize {
        self.scan.height()
    }

    /// Returns the pool used for searches.
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Returns the number of tasks each search is split into at most.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Searches the scan for `template`.
    ///
    /// Returns the first accepted window, or `NoMatch` once `cfg.timeout` has
    /// elapsed. `Dimension` (template does not fit) and `InvalidThreshold`
    /// (negative or non-finite threshold) are returned before anything is
    /// submitted. When every task finishes early without a match the call
    /// still waits out the timeout.
    pub fn find_template(
        &self,
        template: &RasterImage,
        cfg: FindConfig,
    ) -> ScanMatchResult<MatchResult> {
        check_threshold(cfg.threshold)?;
        if template.width() > self.scan.width() || template.height() > self.scan.height() {
            return Err(ScanMatchError::Dimension {
                template_width: template.width(),
                template_height: template.height(),
                scan_width: self.scan.width(),
                scan_height: self.scan.height(),
            });
        }

        let _span = trace_span!(
            "find_template",
            scan_width = self.scan.width(),
            scan_height = self.scan.height(),
            template_width = template.width(),
            template_height = template.height()
        )
        .entered();

        let start = Instant::now();
        let token = CancelToken::with_timeout(cfg.timeout);
        let plan = Arc::new(TemplatePlan::from_raster(template));
        let integral = match cfg.metric {
            Metric::Mse => None,
            Metric::Normalized => Some(self.integral()?),
        };

        let chunks = self.partition(plan.width(), plan.height());
        let groups = self.dispatch(chunks);
        trace_event!("dispatch", groups = groups.len(), workers = self.pool.max_workers());

        let found = Arc::new(AtomicBool::new(false));
        let (result_tx, result_rx) = bounded::<Hit>(1);
        for group in groups {
            let search = GroupSearch {
                chunks: group,
                plan: Arc::clone(&plan),
                integral: integral.clone(),
                metric: cfg.metric,
                threshold: cfg.threshold,
                found: Arc::clone(&found),
                token: token.clone(),
                result_tx: result_tx.clone(),
            };
            let id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
            self.pool.submit_task(Task::new(id, move || {
                search.run();
                Ok(())
            }));
        }

        // `result_tx` stays alive here so an exhausted search still waits
        // for the full timeout instead of observing a disconnect.
        let remaining = token.deadline().saturating_duration_since(Instant::now());
        let outcome = result_rx.recv_timeout(remaining);
        token.cancel();
        self.pool.clear_task_queue();
        drop(result_tx);

        let elapsed = start.elapsed();
        match outcome {
            Ok(hit) => {
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
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                trace_event!("match_timeout", elapsed_ms = elapsed.as_millis() as u64);
                Err(ScanMatchError::NoMatch {
                    timeout: cfg.timeout,
                })
            }
        }
    }

    /// Replaces the scan.
    ///
    /// The pool is drained first (queue cleared, workers stopped and waited
    /// for), so no task of an earlier search can observe the new scan.
    pub fn set_scan(&mut self, scan: &RasterImage) {
        self.pool.clear_task_queue();
        self.pool.stop();
        self.pool.wait();
        self.scan = NormalizedRaster::from_raster(scan);
        self.integral = OnceLock::new();
        self.pool.start();
        trace_event!("scan_replaced", width = scan.width(), height = scan.height());
    }

    fn integral(&self) -> ScanMatchResult<Arc<IntegralImage>> {
        if let Some(integral) = self.integral.get() {
            return Ok(Arc::clone(integral));
        }
        let built = Arc::new(IntegralImage::build(self.scan.view())?);
        Ok(Arc::clone(self.integral.get_or_init(|| built)))
    }

    fn partition(&self, tpl_width: usize, tpl_height: usize) -> Vec<Chunk> {
        let layout = ChunkLayout::new(self.scan.width(), self.scan.height(), tpl_width, tpl_height);
        #[cfg(feature = "rayon")]
        let chunks = layout.partition_par(&self.scan);
        #[cfg(not(feature = "rayon"))]
        let chunks = layout.partition(&self.scan);

        trace_event!(
            "partition",
            chunks = chunks.len(),
            chunk_width = layout.chunk_width,
            chunk_height = layout.chunk_height
        );
        chunks
    }

    /// Sizes the pool for this search and deals chunks into groups.
    fn dispatch(&self, chunks: Vec<Chunk>) -> Vec<Vec<Chunk>> {
        let workers = self.worker_count.min(chunks.len()).max(1);
        let max = self.pool.max_workers();
        if max < workers {
            self.pool.increase_max_workers(workers - max);
        }
        self.pool.start();
        self.distributor.distribute(chunks, workers)
    }
}

pub(crate) fn check_threshold(threshold: f64) -> ScanMatchResult<()> {
    if threshold.is_finite() && threshold >= 0.0 {
        Ok(())
    } else {
        Err(ScanMatchError::InvalidThreshold { threshold })
    }
}

/// Everything one task needs to scan its chunk group.
struct GroupSearch {
    chunks: Vec<Chunk>,
    plan: Arc<TemplatePlan>,
    integral: Option<Arc<IntegralImage>>,
    metric: Metric,
    threshold: f64,
    found: Arc<AtomicBool>,
    token: CancelToken,
    result_tx: Sender<Hit>,
}

impl GroupSearch {
    fn run(&self) {
        let scorer = match (self.metric, self.integral.as_deref()) {
            (Metric::Normalized, Some(integral)) => {
                Scorer::normalized(&self.plan, integral, self.threshold)
            }
            _ => Scorer::mse(&self.plan, self.threshold),
        };
        let halt = Halt::new(&self.found, &self.token);
        for chunk in &self.chunks {
            if halt.at_row() {
                return;
            }
            let hit = scan_view(
                chunk.view(),
                chunk.origin(),
                &scorer,
                self.plan.width(),
                self.plan.height(),
                halt,
            );
            if let Some(hit) = hit {
                if self
                    .found
                    .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    // Single slot and a single winner: never full.
                    let _ = self.result_tx.try_send(hit);
                }
                return;
            }
        }
    }
}
