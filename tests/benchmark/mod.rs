use criterion::{criterion_group, criterion_main};

pub mod fixtures_bench;
pub mod phase_bench;

criterion_group!(benches, fixtures_bench::bench_fixtures, phase_bench::bench_phases);
criterion_main!(benches);
