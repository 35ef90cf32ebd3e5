//! Content hashing throughput for every supported algorithm

use std::io::Cursor;

use cairn_benchmarks::{criterion_config, test_content};
use cairn_core::utils::hash::{hash_bytes, hash_file, hash_reader};
use cairn_core::HashAlgorithm;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::tempdir;

const ALGORITHMS: [HashAlgorithm; 3] = [
    HashAlgorithm::Blake3,
    HashAlgorithm::Sha1,
    HashAlgorithm::Sha256,
];

fn bench_memory_hashing(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_hashing");

    for size in [1024, 102_400, 1_024_000] {
        group.throughput(Throughput::Bytes(size as u64));
        let content = test_content(size, 0);

        for algorithm in ALGORITHMS {
            group.bench_with_input(
                BenchmarkId::new(algorithm.to_string(), size),
                &content,
                |b, data| b.iter(|| black_box(hash_bytes(algorithm, data))),
            );
        }
    }

    group.finish();
}

/// Streaming through the read buffer, as the hash stage does
fn bench_reader_hashing(c: &mut Criterion) {
    let mut group = c.benchmark_group("reader_hashing");
    let size = 1_024_000;
    group.throughput(Throughput::Bytes(size as u64));
    let content = test_content(size, 0);

    for algorithm in ALGORITHMS {
        group.bench_function(algorithm.to_string(), |b| {
            b.iter(|| {
                let mut reader = Cursor::new(&content);
                black_box(hash_reader(algorithm, &mut reader).unwrap())
            })
        });
    }

    group.finish();
}

fn bench_file_hashing(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_hashing");
    let temp_dir = tempdir().unwrap();

    for size in [10_240, 1_024_000, 10_240_000] {
        group.throughput(Throughput::Bytes(size as u64));
        let path = temp_dir.path().join(format!("blob_{}", size));
        std::fs::write(&path, test_content(size, 0)).unwrap();

        group.bench_with_input(BenchmarkId::new("blake3", size), &path, |b, path| {
            b.iter(|| black_box(hash_file(HashAlgorithm::Blake3, path).unwrap()))
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_memory_hashing, bench_reader_hashing, bench_file_hashing
}
criterion_main!(benches);
