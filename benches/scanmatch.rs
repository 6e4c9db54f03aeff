use criterion::{criterion_group, criterion_main, Criterion};
use scanmatch::lowlevel::partition_scan;
use scanmatch::{
    find_template_sequential, FindConfig, Matcher, Metric, NormalizedRaster, Orientation,
    RasterImage,
};
use std::hint::black_box;
use std::time::Duration;

fn make_image(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF;
            data.extend_from_slice(&[value as u8, (value as u8) ^ 0x5A, (y & 0xFF) as u8]);
        }
    }
    data
}

fn extract_patch(
    image: &[u8],
    img_width: usize,
    x0: usize,
    y0: usize,
    width: usize,
    height: usize,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let start = ((y0 + y) * img_width + x0) * 3;
        out.extend_from_slice(&image[start..start + width * 3]);
    }
    out
}

fn raster(data: &[u8], width: usize, height: usize) -> RasterImage {
    RasterImage::from_packed(data, width, height, 24, Orientation::TopDown).unwrap()
}

fn bench_search(c: &mut Criterion) {
    let img_width = 640;
    let img_height = 480;
    let image = make_image(img_width, img_height);
    let scan = raster(&image, img_width, img_height);

    let tpl_width = 32;
    let tpl_height = 24;
    let tpl_data = extract_patch(&image, img_width, 500, 400, tpl_width, tpl_height);
    let template = raster(&tpl_data, tpl_width, tpl_height);

    let normalized = NormalizedRaster::from_raster(&scan);
    c.bench_function("partition_640x480_32x24", |b| {
        b.iter(|| black_box(partition_scan(&normalized, tpl_width, tpl_height)));
    });

    c.bench_function("sequential_mse", |b| {
        b.iter(|| black_box(find_template_sequential(&scan, &template, 1.0, Metric::Mse).unwrap()));
    });

    let matcher = Matcher::new(&scan);
    for metric in [Metric::Mse, Metric::Normalized] {
        let cfg = FindConfig {
            threshold: if metric == Metric::Mse { 1.0 } else { 0.001 },
            timeout: Duration::from_secs(10),
            metric,
        };
        let name = format!("pooled_{metric:?}").to_lowercase();
        c.bench_function(&name, |b| {
            b.iter(|| black_box(matcher.find_template(&template, cfg.clone()).unwrap()));
        });
    }
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
