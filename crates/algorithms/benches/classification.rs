//! Benchmarks for the study classifiers

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glacis_algorithms::classification::{
    kmeans, KMeansParams, RandomForest, RandomForestParams, SvmClassifier, SvmParams,
};
use ndarray::Array2;

/// `n` rows of 8 features in 4 overlapping classes, like a DEM study sample
fn create_samples(n: usize) -> (Array2<f64>, Vec<usize>) {
    let mut data = Vec::with_capacity(n * 8);
    let mut y = Vec::with_capacity(n);
    for i in 0..n {
        let class = i % 4;
        for j in 0..8 {
            let pattern = ((i * 7 + j * 13) % 100) as f64 / 50.0 - 1.0;
            data.push(class as f64 * 0.5 * (j % 3) as f64 + pattern);
        }
        y.push(class);
    }
    (Array2::from_shape_vec((n, 8), data).unwrap(), y)
}

fn bench_random_forest(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification/random_forest");
    group.sample_size(10);
    for n in [500, 1600] {
        let (x, y) = create_samples(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| RandomForest::fit(black_box(&x), black_box(&y), &RandomForestParams::default()).unwrap())
        });
    }
    group.finish();
}

fn bench_svm(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification/svm");
    group.sample_size(10);
    for n in [500, 1600] {
        let (x, y) = create_samples(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| SvmClassifier::fit(black_box(&x), black_box(&y), &SvmParams::default()).unwrap())
        });
    }
    group.finish();
}

fn bench_kmeans(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification/kmeans");
    for n in [1000, 5000] {
        let (x, _) = create_samples(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| kmeans(black_box(&x), &KMeansParams { k: 4, ..Default::default() }).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_random_forest, bench_svm, bench_kmeans);
criterion_main!(benches);
