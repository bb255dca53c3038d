use criterion::*;
use std::hint::black_box;

use fieldsim::gpu::plan::FramePlan;
use fieldsim::SimulationConfig;

fn plan_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan");

    // The standard bloom chain: one evolution program with three
    // kernels, nine single-kernel preparation programs, two render
    // stages, six passes per tick.
    let kernels: Vec<u32> = std::iter::once(3).chain(std::iter::repeat(1).take(9)).collect();

    group.bench_function("build_bloom_chain_6_passes", |b| {
        let config = SimulationConfig::default();
        b.iter(|| {
            let plan = FramePlan::build(black_box(&config), &kernels, 2, 6, true);
            black_box(plan.dispatch_count());
            black_box(plan);
        });
    });

    group.bench_function("build_volume_60_passes", |b| {
        let config = SimulationConfig { width: 512, height: 512, depth: 64, ..SimulationConfig::default() };
        b.iter(|| {
            let plan = FramePlan::build(black_box(&config), &kernels, 2, 60, false);
            black_box(plan);
        });
    });

    group.finish();
}

criterion_group!(benches, plan_benchmark);
criterion_main!(benches);
