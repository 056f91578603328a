//! Benchmarks for the per-frame stages and full conversions.
//!
//! Run with: cargo bench
//!
//! The end-to-end benchmark requires fixture files from
//! `tests/fixtures/generate_fixtures.sh`.

use std::{hint::black_box, path::Path};

use criterion::Criterion;
use gifcast::{
    ColorStrategy, Converter, FfmpegLogLevel, MemorySource, OutputTarget, PaletteMode,
    ProcessingConfig, ProcessingOrder, Scaler, TimingStats, encode_to_memory, palette,
};
use image::{Rgb, RgbImage};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

fn test_pattern(width: u32, height: u32, seed: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            ((x * 3 + seed) % 256) as u8,
            ((y * 5 + seed * 2) % 256) as u8,
            (((x ^ y) + seed) % 256) as u8,
        ])
    })
}

fn benchmark_scaling(criterion: &mut Criterion) {
    let frame = test_pattern(640, 360, 0);
    for factor in [0.5, 0.33] {
        let scaler = Scaler::new(factor);
        criterion.bench_function(&format!("area resample 640x360 x{factor}"), |bencher| {
            bencher.iter(|| scaler.apply(black_box(frame.clone())));
        });
    }
}

fn benchmark_palettes(criterion: &mut Criterion) {
    let frame = test_pattern(320, 180, 7);

    criterion.bench_function("octree palette (32 colors)", |bencher| {
        bencher.iter(|| palette::quantize(black_box(&frame), PaletteMode::Fast));
    });

    criterion.bench_function("median cut palette (256 colors)", |bencher| {
        bencher.iter(|| palette::quantize(black_box(&frame), PaletteMode::Adaptive));
    });
}

#[cfg(feature = "vector-quantization")]
fn benchmark_kmeans(criterion: &mut Criterion) {
    let frame = test_pattern(320, 180, 3);
    for colors in [16, 64] {
        criterion.bench_function(&format!("mini-batch k-means ({colors} colors)"), |bencher| {
            bencher.iter(|| gifcast::kmeans::quantize(black_box(&frame), colors));
        });
    }
}

#[cfg(not(feature = "vector-quantization"))]
fn benchmark_kmeans(_criterion: &mut Criterion) {}

fn benchmark_synthetic_render(criterion: &mut Criterion) {
    let frames: Vec<RgbImage> = (0..30).map(|i| test_pattern(320, 240, i)).collect();
    let mut orders = vec![("palette", ProcessingConfig::new())];
    if gifcast::vector_quantization_available() {
        let vq = ProcessingConfig::new().with_color(ColorStrategy::VectorQuantize { colors: 16 });
        orders.push(("vq efficiency", vq.clone().with_order(ProcessingOrder::Efficiency)));
        orders.push(("vq quality", vq.with_order(ProcessingOrder::Quality)));
    }

    for (label, config) in orders {
        let converter = Converter::new(config).unwrap();
        criterion.bench_function(&format!("render 30 synthetic frames ({label})"), |bencher| {
            bencher.iter(|| {
                let mut stats = TimingStats::new();
                let source = MemorySource::new(frames.clone(), 30.0);
                let animation = converter.render(source, &mut stats).unwrap();
                encode_to_memory(&animation.frames, animation.frame_duration_ms).unwrap()
            });
        });
    }
}

fn benchmark_file_conversion(criterion: &mut Criterion) {
    gifcast::set_ffmpeg_log_level(FfmpegLogLevel::Error);

    if !Path::new(SAMPLE_VIDEO).exists() {
        eprintln!("Skipping benchmark: fixture not found");
        return;
    }

    let directory = tempfile::tempdir().unwrap();
    let output = directory.path().join("bench.gif");
    let converter = Converter::new(ProcessingConfig::new().with_time_logging(false)).unwrap();

    criterion.bench_function("convert sample video (defaults)", |bencher| {
        bencher.iter(|| {
            converter
                .convert(SAMPLE_VIDEO, OutputTarget::path(&output))
                .unwrap()
        });
    });
}

criterion::criterion_group!(
    benches,
    benchmark_scaling,
    benchmark_palettes,
    benchmark_kmeans,
    benchmark_synthetic_render,
    benchmark_file_conversion,
);
criterion::criterion_main!(benches);
