//! Common utilities for benchmarks

use std::path::Path;
use std::time::Duration;

use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};

/// Criterion with flamegraph profiling
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(Duration::from_secs(3))
        .measurement_time(Duration::from_secs(10))
        .sample_size(50)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

/// Deterministic content; `seed` makes otherwise equal-sized blobs differ
pub fn test_content(size: usize, seed: u8) -> Vec<u8> {
    (0..size)
        .map(|i| (i % 251) as u8 ^ seed)
        .collect()
}

/// Write `file_count` files of which only `distinct` have different content
pub fn write_tree(root: &Path, file_count: usize, distinct: usize, file_size: usize) {
    for i in 0..file_count {
        let seed = (i % distinct.max(1)) as u8;
        let path = root.join(format!("dir_{}", i % 8)).join(format!("file_{}.bin", i));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, test_content(file_size, seed)).unwrap();
    }
}
