//! Common utilities for benchmarks

use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};
use rag_graph::{DeadlockDetector, EnumerationLimits};

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(3))
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(50)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

pub fn process_id(i: usize) -> String {
    format!("P{:05}", i)
}

pub fn resource_id(i: usize) -> String {
    format!("R{:05}", i)
}

/// `n` processes and `n` resources with no edges
pub fn empty_detector(n: usize, limits: EnumerationLimits) -> DeadlockDetector {
    let detector = DeadlockDetector::new().with_limits(limits);
    for i in 0..n {
        detector.add_process(&process_id(i)).expect("fresh process id");
        detector.add_resource(&resource_id(i)).expect("fresh resource id");
    }
    detector
}

/// Process i holds resource i and waits for resource i + 1: a chain, no cycle
pub fn chain_detector(n: usize) -> DeadlockDetector {
    let detector = empty_detector(n, EnumerationLimits::default());
    for i in 0..n {
        detector
            .allocate_resource(&process_id(i), &resource_id(i))
            .expect("valid allocation");
        if i + 1 < n {
            detector
                .request_resource(&process_id(i), &resource_id(i + 1))
                .expect("valid request");
        }
    }
    detector
}

/// The chain closed into one ring through all 2n nodes
pub fn ring_detector(n: usize) -> DeadlockDetector {
    let detector = chain_detector(n);
    if n > 0 {
        detector
            .request_resource(&process_id(n - 1), &resource_id(0))
            .expect("valid request");
    }
    detector
}

/// `n` separate deadlocks: process i holds resource i and waits for it
pub fn pairs_detector(n: usize) -> DeadlockDetector {
    let detector = empty_detector(n, EnumerationLimits::unbounded());
    for i in 0..n {
        detector
            .allocate_resource(&process_id(i), &resource_id(i))
            .expect("valid allocation");
        detector
            .request_resource(&process_id(i), &resource_id(i))
            .expect("valid request");
    }
    detector
}

/// Every process holds one resource and waits for all the others; the cycle
/// count grows factorially with `n`
pub fn dense_detector(n: usize, limits: EnumerationLimits) -> DeadlockDetector {
    let detector = empty_detector(n, limits);
    for i in 0..n {
        detector
            .allocate_resource(&process_id(i), &resource_id(i))
            .expect("valid allocation");
        for j in (0..n).filter(|&j| j != i) {
            detector
                .request_resource(&process_id(i), &resource_id(j))
                .expect("valid request");
        }
    }
    detector
}
