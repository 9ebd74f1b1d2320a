use criterion::{BenchmarkId, Criterion};
use reactive_list_bench::bench::{BenchConfig, BenchmarkDriver, Phase};
use tokio::runtime::Runtime;
use tokio::task::LocalSet;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("current-thread runtime")
}

pub fn bench_phases(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("phases");
    group.sample_size(10);

    for phase in Phase::ALL {
        group.bench_with_input(BenchmarkId::new("phase", phase), &phase, |b, &phase| {
            b.iter(|| {
                LocalSet::new().block_on(&rt, async {
                    let driver = BenchmarkDriver::new(BenchConfig {
                        list_len: 50,
                        ..BenchConfig::default()
                    })
                    .expect("driver");
                    driver.run_phase(phase).await.expect("phase run")
                })
            })
        });
    }
    group.finish();
}
