use criterion::{BenchmarkId, Criterion};
use reactive_list_bench::fixtures::{generate_data, Datasets};
use std::hint::black_box;

pub fn bench_fixtures(c: &mut Criterion) {
    let mut group = c.benchmark_group("fixtures");
    for len in [25usize, 250] {
        group.bench_with_input(BenchmarkId::new("generate_data", len), &len, |b, &len| {
            b.iter(|| black_box(generate_data(len)))
        });
    }
    group.bench_function("datasets_250", |b| b.iter(|| black_box(Datasets::generate(250))));
    group.finish();
}
