use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dde_agg::{select_indices, CoverageRule, ResampleUnit, SimilarityMatrix};

fn synthetic_vectors(pops: usize, tasks: usize) -> Vec<Vec<f64>> {
    (0..pops)
        .map(|pop| {
            (0..tasks)
                .map(|task| ((pop * 31 + task * 17) % 250) as f64)
                .collect()
        })
        .collect()
}

fn bench_similarity(c: &mut Criterion) {
    let vectors = synthetic_vectors(64, 24);
    let mut group = c.benchmark_group("similarity_throughput");
    group.bench_function("matrix_and_greedy_order_64x24", |b| {
        b.iter(|| {
            let matrix = SimilarityMatrix::compute(black_box(&vectors), CoverageRule::AtLeast(100.0));
            black_box(matrix.greedy_order(0));
        })
    });
    let keys: Vec<u64> = (0..10_000).collect();
    group.bench_function("resample_epoch_10k", |b| {
        b.iter(|| select_indices(black_box(&keys), ResampleUnit::Epoch, 7).expect("ordered keys"))
    });
    group.finish();
}

criterion_group!(benches, bench_similarity);
criterion_main!(benches);
