//! Whole archive runs against an in-memory store

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cairn_archiver::{Archiver, ArchiverOptions};
use cairn_benchmarks::{criterion_config, test_content, write_tree};
use cairn_core::HashAlgorithm;
use cairn_store::MemoryStore;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::tempdir;
use tokio::runtime::Runtime;
use walkdir::WalkDir;

/// Files under `root`, collected once outside the measured loop
fn files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

fn options() -> ArchiverOptions {
    ArchiverOptions::default().with_batching(50, Duration::from_millis(5))
}

/// Every file pushed twice, so half the items resolve in the dedupe stage
fn bench_archive_tree(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("archive_tree");
    group.sample_size(20);

    for (file_count, distinct) in [(100, 100), (500, 50)] {
        let temp_dir = tempdir().unwrap();
        write_tree(temp_dir.path(), file_count, distinct, 10_240);
        let paths = files(temp_dir.path());
        group.throughput(Throughput::Elements(2 * paths.len() as u64));

        group.bench_with_input(
            BenchmarkId::new(format!("distinct_{}", distinct), file_count),
            &paths,
            |b, paths| {
                b.iter(|| {
                    rt.block_on(async {
                        let store = Arc::new(MemoryStore::new(HashAlgorithm::Blake3));
                        let archiver = Archiver::new(store, options());
                        for _ in 0..2 {
                            for path in paths {
                                archiver
                                    .push_file(path.display().to_string(), path.clone())
                                    .await
                                    .unwrap();
                            }
                        }
                        archiver.close().await.unwrap();
                        black_box(archiver.stats().summary())
                    })
                })
            },
        );
    }

    group.finish();
}

/// A second run over already stored content only looks digests up
fn bench_archive_warm_store(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = Arc::new(MemoryStore::new(HashAlgorithm::Blake3));
    let blobs: Vec<Vec<u8>> = (0..200).map(|i| test_content(4096, i as u8)).collect();
    for blob in &blobs {
        store.insert(blob);
    }

    let mut group = c.benchmark_group("archive_warm_store");
    group.throughput(Throughput::Elements(blobs.len() as u64));
    group.bench_function("streams", |b| {
        b.iter(|| {
            rt.block_on(async {
                let archiver = Archiver::new(store.clone(), options());
                for (i, blob) in blobs.iter().enumerate() {
                    archiver
                        .push(format!("blob_{}", i), Cursor::new(blob.clone()))
                        .await
                        .unwrap();
                }
                archiver.close().await.unwrap();
                black_box(archiver.stats().summary())
            })
        })
    });
    group.finish();
}

criterion_group! {
    name = benches;
    config = criterion_config();
    targets = bench_archive_tree, bench_archive_warm_store
}
criterion_main!(benches);
