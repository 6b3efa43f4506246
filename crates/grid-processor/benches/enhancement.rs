//! Benchmarks for the enhancement chain.
//!
//! Run with: cargo bench --package grid-processor --bench enhancement

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use grid_processor::{
    mask_with_aoi, unsharp_mask, upsample, EnhancementChain, EnhancementConfig, NoConform,
};
use raster_common::{AoiDocument, AreaOfInterest, GeoTransform};
use test_utils::{ndvi_field, rectangle_polygon};

fn field_aoi(size: usize) -> AreaOfInterest {
    let s = size as f64;
    let polygon = rectangle_polygon((0.1 * s, 0.1 * s, 0.9 * s, 0.9 * s));
    match AoiDocument::from_value(polygon) {
        Ok(doc) => AreaOfInterest::new(vec![doc]),
        Err(e) => panic!("invalid AOI: {}", e),
    }
}

fn transform(size: usize) -> GeoTransform {
    match GeoTransform::new(0.0, size as f64, 1.0, 1.0) {
        Ok(t) => t,
        Err(e) => panic!("invalid transform: {}", e),
    }
}

fn bench_unsharp(c: &mut Criterion) {
    let mut group = c.benchmark_group("unsharp_mask");
    for size in [128usize, 512] {
        let grid = ndvi_field(size, size);
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::new("sigma_1.2", size), &grid, |b, grid| {
            b.iter(|| unsharp_mask(black_box(grid), 1.2, 1.5))
        });
    }
    group.finish();
}

fn bench_mask(c: &mut Criterion) {
    let mut group = c.benchmark_group("mask");
    for size in [128usize, 512] {
        let grid = ndvi_field(size, size);
        let gt = transform(size);
        let aoi = field_aoi(size);
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::new("rectangle", size), &grid, |b, grid| {
            b.iter(|| mask_with_aoi(black_box(grid), &gt, &aoi))
        });
    }
    group.finish();
}

fn bench_upsample(c: &mut Criterion) {
    let mut group = c.benchmark_group("upsample");
    let grid = ndvi_field(64, 64);
    let gt = transform(64);
    for factor in [4.0f64, 12.0] {
        group.bench_with_input(BenchmarkId::new("bilinear", factor), &factor, |b, &factor| {
            b.iter(|| upsample(black_box(&grid), &gt, factor))
        });
    }
    group.finish();
}

fn bench_full_chain(c: &mut Criterion) {
    let chain = EnhancementChain::new(EnhancementConfig::compare_all());
    let grid = ndvi_field(64, 64);
    let gt = transform(64);
    let aoi = field_aoi(64);

    c.bench_function("compare_all_chain_64", |b| {
        b.iter(|| chain.apply(black_box(grid.clone()), gt, &aoi, None, &NoConform))
    });
}

criterion_group!(benches, bench_unsharp, bench_mask, bench_upsample, bench_full_chain);
criterion_main!(benches);
