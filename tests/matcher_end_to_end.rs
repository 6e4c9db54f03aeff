use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scanmatch::lowlevel::{IntegralImage, Scorer, TemplatePlan};
use scanmatch::{
    find_template_sequential, FindConfig, MatchResult, Matcher, MatcherConfig, Metric,
    NormalizedRaster, Orientation, RasterImage, ScanMatchError, Striped,
};
use std::time::{Duration, Instant};

fn rgb_raster(data: &[u8], width: usize, height: usize) -> RasterImage {
    RasterImage::from_packed(data, width, height, 24, Orientation::TopDown).unwrap()
}

fn solid(width: usize, height: usize, color: [u8; 3]) -> Vec<u8> {
    color.repeat(width * height)
}

fn paint(data: &mut [u8], width: usize, rect: (usize, usize, usize, usize), color: [u8; 3]) {
    let (x0, y0, w, h) = rect;
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            let idx = (y * width + x) * 3;
            data[idx..idx + 3].copy_from_slice(&color);
        }
    }
}

fn noise(width: usize, height: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..width * height * 3).map(|_| rng.random_range(0..=255)).collect()
}

fn crop(data: &[u8], width: usize, rect: (usize, usize, usize, usize)) -> Vec<u8> {
    let (x0, y0, w, h) = rect;
    let mut out = Vec::with_capacity(w * h * 3);
    for y in y0..y0 + h {
        let start = (y * width + x0) * 3;
        out.extend_from_slice(&data[start..start + w * 3]);
    }
    out
}

/// 100x100 black scan with a 10x10 square at (40, 40).
fn square_scene(color: [u8; 3]) -> RasterImage {
    let mut data = solid(100, 100, [0, 0, 0]);
    paint(&mut data, 100, (40, 40, 10, 10), color);
    rgb_raster(&data, 100, 100)
}

fn white_template() -> RasterImage {
    rgb_raster(&solid(10, 10, [255, 255, 255]), 10, 10)
}

fn find(
    matcher: &Matcher,
    template: &RasterImage,
    threshold: f64,
    timeout: Duration,
) -> Result<MatchResult, ScanMatchError> {
    matcher.find_template(
        template,
        FindConfig {
            threshold,
            timeout,
            ..FindConfig::default()
        },
    )
}

#[test]
fn white_square_is_found_in_black_scan() {
    let matcher = Matcher::new(&square_scene([255, 255, 255]));
    let found = find(&matcher, &white_template(), 50.0, Duration::from_secs(1)).unwrap();
    assert_eq!((found.x, found.y), (40, 40));
    assert_eq!(found.score, 0.0);
    assert!(found.elapsed < Duration::from_secs(1));
}

#[test]
fn near_exact_search_times_out() {
    let matcher = Matcher::new(&square_scene([250, 250, 250]));
    let timeout = Duration::from_secs(1);
    let start = Instant::now();
    let err = find(&matcher, &white_template(), 1.0, timeout).unwrap_err();
    let elapsed = start.elapsed();

    assert_eq!(err, ScanMatchError::NoMatch { timeout });
    assert!(elapsed >= timeout - Duration::from_millis(20), "returned after {elapsed:?}");
    assert!(elapsed <= timeout + Duration::from_millis(500), "returned after {elapsed:?}");
}

#[test]
fn short_timeout_is_honoured() {
    let matcher = Matcher::new(&square_scene([250, 250, 250]));
    let timeout = Duration::from_millis(150);
    let start = Instant::now();
    assert!(find(&matcher, &white_template(), 1.0, timeout).is_err());
    let elapsed = start.elapsed();
    assert!(elapsed >= timeout - Duration::from_millis(20), "returned after {elapsed:?}");
    assert!(elapsed <= timeout + Duration::from_millis(500), "returned after {elapsed:?}");
}

#[test]
fn exact_copy_is_found_in_noise() {
    let (width, height) = (160, 120);
    let scan = noise(width, height, 7);
    let template = crop(&scan, width, (70, 50, 16, 12));
    let matcher = Matcher::new(&rgb_raster(&scan, width, height));
    let found = find(&matcher, &rgb_raster(&template, 16, 12), 0.5, Duration::from_secs(5)).unwrap();
    assert_eq!((found.x, found.y), (70, 50));
}

#[test]
fn threshold_decides_around_true_mse() {
    // Every channel is off by 3, so the true match scores exactly 9.
    let matcher = Matcher::new(&square_scene([103, 103, 103]));
    let template = rgb_raster(&solid(10, 10, [100, 100, 100]), 10, 10);

    let err = find(&matcher, &template, 8.9, Duration::from_millis(200)).unwrap_err();
    assert!(matches!(err, ScanMatchError::NoMatch { .. }));

    let found = find(&matcher, &template, 9.0, Duration::from_secs(5)).unwrap();
    assert_eq!((found.x, found.y), (40, 40));
    assert_eq!(found.score, 9.0);
}

#[test]
fn error_concentrated_in_one_row_matches_from_true_mse_upward() {
    // Square of 100 whose first row is 110: true MSE is 10 but that row alone scores 100.
    let mut data = solid(100, 100, [0, 0, 0]);
    paint(&mut data, 100, (40, 40, 10, 10), [100, 100, 100]);
    paint(&mut data, 100, (40, 40, 10, 1), [110, 110, 110]);
    let matcher = Matcher::new(&rgb_raster(&data, 100, 100));
    let template = rgb_raster(&solid(10, 10, [100, 100, 100]), 10, 10);

    let err = find(&matcher, &template, 9.9, Duration::from_millis(200)).unwrap_err();
    assert!(matches!(err, ScanMatchError::NoMatch { .. }));

    for threshold in [10.0, 15.0, 20.0, 24.9, 40.0] {
        let found = find(&matcher, &template, threshold, Duration::from_secs(5)).unwrap();
        assert_eq!((found.x, found.y), (40, 40), "threshold {threshold}");
        assert_eq!(found.score, 10.0);
    }
}

#[test]
fn normalized_near_threshold_match_with_dark_template_row() {
    let (width, height) = (80, 60);
    let (ox, oy) = (25, 30);
    let mut scan = noise(width, height, 17);
    let mut template = crop(&scan, width, (ox, oy, 10, 10));
    template[..30].fill(0);
    paint(&mut scan, width, (ox, oy, 10, 1), [3, 3, 3]);

    let scan = rgb_raster(&scan, width, height);
    let template = rgb_raster(&template, 10, 10);

    let normalized = NormalizedRaster::from_raster(&scan);
    let integral = IntegralImage::build(normalized.view()).unwrap();
    let plan = TemplatePlan::from_raster(&template);
    let score = Scorer::normalized(&plan, &integral, 1.0).score(normalized.view(), ox, oy, (0, 0));
    assert!(score > 0.0 && score.is_finite());

    let matcher = Matcher::new(&scan);
    let found = matcher
        .find_template(
            &template,
            FindConfig {
                threshold: score * 2.0,
                timeout: Duration::from_secs(5),
                metric: Metric::Normalized,
            },
        )
        .unwrap();
    assert_eq!((found.x, found.y), (ox, oy));
    assert_eq!(found.score, score);
}

#[test]
fn pool_goes_idle_shortly_after_a_timeout() {
    let (width, height) = (1000, 800);
    let matcher = Matcher::with_config(
        &rgb_raster(&noise(width, height, 29), width, height),
        MatcherConfig {
            worker_count: Some(4),
            ..MatcherConfig::default()
        },
    );
    // Uniform noise sits around MSE 5500 from mid-gray, so most of every
    // window is scored before the early abort and the scan outlasts the timeout.
    let template = rgb_raster(&solid(40, 40, [128, 128, 128]), 40, 40);
    let err = find(&matcher, &template, 4000.0, Duration::from_millis(200)).unwrap_err();
    assert!(matches!(err, ScanMatchError::NoMatch { .. }));

    let start = Instant::now();
    matcher.pool().wait();
    let drained = start.elapsed();
    assert!(drained <= Duration::from_millis(500), "pool drained after {drained:?}");
    assert!(!matcher.pool().is_working());
    assert_eq!(matcher.pool().active_workers(), 0);
}

#[test]
fn invalid_threshold_is_rejected_before_submission() {
    let scan = square_scene([255, 255, 255]);
    let matcher = Matcher::new(&scan);
    for threshold in [f64::NAN, f64::INFINITY, -1.0] {
        let err = find(&matcher, &white_template(), threshold, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, ScanMatchError::InvalidThreshold { .. }), "{threshold}");
        let err = find_template_sequential(&scan, &white_template(), threshold, Metric::Mse)
            .unwrap_err();
        assert!(matches!(err, ScanMatchError::InvalidThreshold { .. }), "{threshold}");
    }
    assert_eq!(matcher.pool().stats().submitted_tasks, 0);
}

#[test]
fn oversized_template_is_rejected_before_submission() {
    let matcher = Matcher::new(&rgb_raster(&solid(20, 10, [0, 0, 0]), 20, 10));
    for (w, h) in [(21, 5), (5, 11), (30, 30)] {
        let template = rgb_raster(&solid(w, h, [0, 0, 0]), w, h);
        let err = find(&matcher, &template, 100.0, Duration::from_secs(1)).unwrap_err();
        assert_eq!(
            err,
            ScanMatchError::Dimension {
                template_width: w,
                template_height: h,
                scan_width: 20,
                scan_height: 10,
            }
        );
    }
    assert_eq!(matcher.pool().stats().submitted_tasks, 0);
}

#[test]
fn template_equal_to_scan_is_searched() {
    let scan = noise(24, 18, 3);
    let matcher = Matcher::new(&rgb_raster(&scan, 24, 18));
    let found = find(&matcher, &rgb_raster(&scan, 24, 18), 0.5, Duration::from_secs(5)).unwrap();
    assert_eq!((found.x, found.y), (0, 0));
}

#[test]
fn matcher_is_reusable_and_scan_can_be_replaced() {
    let mut matcher = Matcher::new(&square_scene([255, 255, 255]));
    let template = white_template();
    for _ in 0..3 {
        let found = find(&matcher, &template, 50.0, Duration::from_secs(5)).unwrap();
        assert_eq!((found.x, found.y), (40, 40));
    }

    let mut data = solid(80, 90, [0, 0, 0]);
    paint(&mut data, 80, (10, 70, 10, 10), [255, 255, 255]);
    matcher.set_scan(&rgb_raster(&data, 80, 90));
    assert_eq!((matcher.scan_width(), matcher.scan_height()), (80, 90));

    let found = find(&matcher, &template, 50.0, Duration::from_secs(5)).unwrap();
    assert_eq!((found.x, found.y), (10, 70));
}

#[test]
fn bottom_up_scan_reports_top_down_coordinates() {
    let (width, height) = (64, 48);
    let scan = noise(width, height, 11);
    let template = crop(&scan, width, (20, 5, 8, 8));

    let mut flipped = Vec::with_capacity(scan.len());
    for row in scan.chunks_exact(width * 3).rev() {
        flipped.extend_from_slice(row);
    }
    let raster = RasterImage::from_packed(&flipped, width, height, 24, Orientation::BottomUp).unwrap();

    let matcher = Matcher::new(&raster);
    let found = find(&matcher, &rgb_raster(&template, 8, 8), 0.5, Duration::from_secs(5)).unwrap();
    assert_eq!((found.x, found.y), (20, 5));
}

#[test]
fn normalized_metric_finds_textured_template() {
    let (width, height) = (120, 80);
    let scan = noise(width, height, 21);
    let template = crop(&scan, width, (30, 20, 12, 10));
    let matcher = Matcher::new(&rgb_raster(&scan, width, height));
    let found = matcher
        .find_template(
            &rgb_raster(&template, 12, 10),
            FindConfig {
                threshold: 0.01,
                timeout: Duration::from_secs(5),
                metric: Metric::Normalized,
            },
        )
        .unwrap();
    assert_eq!((found.x, found.y), (30, 20));
}

#[test]
fn explicit_worker_count_grows_the_pool() {
    let (width, height) = (200, 150);
    let scan = noise(width, height, 5);
    let template = crop(&scan, width, (150, 120, 10, 10));
    let matcher = Matcher::with_config(
        &rgb_raster(&scan, width, height),
        MatcherConfig {
            worker_count: Some(4),
            ..MatcherConfig::default()
        },
    )
    .with_distributor(Striped);
    let found = find(&matcher, &rgb_raster(&template, 10, 10), 0.5, Duration::from_secs(5)).unwrap();
    assert_eq!((found.x, found.y), (150, 120));
    assert!(matcher.pool().max_workers() >= 4);
    assert!(matcher.pool().stats().submitted_tasks <= 4);
}

#[test]
fn sequential_search_agrees_with_pooled_search() {
    let (width, height) = (90, 70);
    let scan = noise(width, height, 13);
    let template = crop(&scan, width, (61, 33, 9, 7));
    let scan = rgb_raster(&scan, width, height);
    let template = rgb_raster(&template, 9, 7);

    let sequential = find_template_sequential(&scan, &template, 0.5, Metric::Mse).unwrap();
    let pooled = find(&Matcher::new(&scan), &template, 0.5, Duration::from_secs(5)).unwrap();
    assert_eq!((sequential.x, sequential.y), (61, 33));
    assert_eq!((pooled.x, pooled.y), (sequential.x, sequential.y));

    let normalized = find_template_sequential(&scan, &template, 0.01, Metric::Normalized).unwrap();
    assert_eq!((normalized.x, normalized.y), (61, 33));
}

#[test]
fn sequential_search_reports_failures() {
    let scan = square_scene([250, 250, 250]);
    let err = find_template_sequential(&scan, &white_template(), 1.0, Metric::Mse).unwrap_err();
    assert_eq!(err, ScanMatchError::NoMatch { timeout: Duration::ZERO });

    let big = rgb_raster(&solid(101, 10, [0, 0, 0]), 101, 10);
    let err = find_template_sequential(&scan, &big, 1.0, Metric::Mse).unwrap_err();
    assert!(matches!(err, ScanMatchError::Dimension { .. }));
}
