//! Alignment Planner Benchmarks
//!
//! Planning cost for batches of growing size over a week-long window.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kuba_rollup::query::{align_requests, Request};
use kuba_rollup::{Consolidator, TierDescriptor, TierSet};
use std::hint::black_box;

fn tiers() -> TierSet {
    TierSet::new(
        21600,
        vec![
            TierDescriptor::new(600, 21600, 1),
            TierDescriptor::new(7200, 21600, 1),
            TierDescriptor::new(21600, 21600, 1),
        ],
    )
}

/// Batch of series cycling through common raw intervals
fn create_batch(series_count: usize) -> Vec<Request> {
    const RAW: [u32; 3] = [10, 30, 60];
    (0..series_count)
        .map(|i| {
            Request::new(
                format!("host{}.cpu.user", i),
                0,
                3600 * 24 * 7,
                100,
                1000,
                Consolidator::Avg,
                RAW[i % RAW.len()],
            )
        })
        .collect()
}

fn bench_align_requests(c: &mut Criterion) {
    let mut group = c.benchmark_group("align_requests");
    let tiers = tiers();

    for series_count in [3, 100, 1000] {
        let batch = create_batch(series_count);
        group.throughput(Throughput::Elements(series_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(series_count),
            &batch,
            |b, batch| b.iter(|| align_requests(black_box(batch.clone()), &tiers)),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_align_requests);
criterion_main!(benches);
