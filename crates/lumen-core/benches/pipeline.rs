//! Benchmarks for the Lumen ingestion pipeline.
//!
//! Run with: cargo bench -p lumen-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbImage};

use lumen_core::config::Config;
use lumen_core::pipeline::{
    CanonicalRaster, Dispatcher, HashCalculator, ImagePipeline, PreviewGenerator, ProcessOptions,
};

fn synthetic_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
    });
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

fn synthetic_raster(width: u32, height: u32) -> CanonicalRaster {
    CanonicalRaster::from_rgb(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
    }))
}

fn benchmark_dispatch(c: &mut Criterion) {
    let bytes = synthetic_png(64, 64);

    c.bench_function("dispatch_classify", |b| {
        b.iter(|| Dispatcher::classify(black_box(&bytes), black_box("bench.png")))
    });
}

fn benchmark_hotpreview(c: &mut Criterion) {
    let raster = synthetic_raster(1920, 1080);

    c.bench_function("hotpreview_generate", |b| {
        b.iter(|| PreviewGenerator::hotpreview(black_box(&raster)).unwrap())
    });
}

fn benchmark_hothash(c: &mut Criterion) {
    let raster = synthetic_raster(1920, 1080);
    let preview = PreviewGenerator::hotpreview(&raster).unwrap();

    c.bench_function("hothash_blake3", |b| {
        b.iter(|| HashCalculator::hothash(black_box(&preview)))
    });
}

fn benchmark_full_pipeline(c: &mut Criterion) {
    let bytes = synthetic_png(1920, 1080);
    let pipeline = ImagePipeline::new(&Config::default());
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("process_png_1080p", |b| {
        b.iter(|| {
            let result = rt.block_on(pipeline.process_bytes(
                black_box(bytes.clone()),
                "bench.png",
                &ProcessOptions::default(),
            ));
            result.unwrap()
        })
    });
}

criterion_group!(
    benches,
    benchmark_dispatch,
    benchmark_hotpreview,
    benchmark_hothash,
    benchmark_full_pipeline
);
criterion_main!(benches);
