//! Cycle enumeration performance benchmarks
//!
//! Measures Johnson's search on graphs with no cycle, one long cycle, many
//! small separate cycles, and a factorial number of cycles bounded by the cap.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rag_benchmarks::{chain_detector, criterion_config, dense_detector, pairs_detector, ring_detector};
use rag_graph::cycles::enumerate_cycles;
use rag_graph::EnumerationLimits;

/// Acyclic graphs exit after the first SCC pass
fn bench_acyclic(c: &mut Criterion) {
    let mut group = c.benchmark_group("enumerate_acyclic");

    for size in [100, 1_000, 10_000] {
        let snapshot = chain_detector(size).snapshot();
        group.throughput(Throughput::Elements(snapshot.node_count() as u64));

        group.bench_with_input(BenchmarkId::new("nodes", size * 2), &snapshot, |b, snapshot| {
            b.iter(|| black_box(enumerate_cycles(snapshot, &EnumerationLimits::default())));
        });
    }

    group.finish();
}

/// A single cycle through every node
fn bench_ring(c: &mut Criterion) {
    let mut group = c.benchmark_group("enumerate_ring");

    for size in [100, 1_000, 10_000] {
        let snapshot = ring_detector(size).snapshot();
        group.throughput(Throughput::Elements(snapshot.node_count() as u64));

        group.bench_with_input(BenchmarkId::new("nodes", size * 2), &snapshot, |b, snapshot| {
            b.iter(|| black_box(enumerate_cycles(snapshot, &EnumerationLimits::default())));
        });
    }

    group.finish();
}

/// One two-node cycle per process; time should grow linearly with the count
fn bench_disjoint_pairs(c: &mut Criterion) {
    let mut group = c.benchmark_group("enumerate_disjoint_pairs");

    for size in [1_000, 4_000, 16_000] {
        let snapshot = pairs_detector(size).snapshot();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("cycles", size), &snapshot, |b, snapshot| {
            b.iter(|| black_box(enumerate_cycles(snapshot, &EnumerationLimits::unbounded())));
        });
    }

    group.finish();
}

/// Output-sensitive cost: time should track the cap, not the graph
fn bench_dense_capped(c: &mut Criterion) {
    let mut group = c.benchmark_group("enumerate_dense_capped");
    group.sample_size(20);

    let snapshot = dense_detector(8, EnumerationLimits::default()).snapshot();
    for cap in [10, 100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(cap as u64));

        group.bench_with_input(BenchmarkId::new("cap", cap), &cap, |b, &cap| {
            let limits = EnumerationLimits::default().with_max_cycles(cap);
            b.iter(|| black_box(enumerate_cycles(&snapshot, &limits)));
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_acyclic, bench_ring, bench_disjoint_pairs, bench_dense_capped
}
criterion_main!(benches);
