//! Benchmark utilities.

use rand::Rng;
use segwal_core::{Filer, SegmentInfo};
use segwal_storage::MemVfs;
use std::sync::Arc;

/// Generate random payload data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate a batch of random payloads.
pub fn random_batch(count: usize, size: usize) -> Vec<Vec<u8>> {
    (0..count).map(|_| random_data(size)).collect()
}

/// Creates a filer over a fresh in-memory VFS.
pub fn mem_filer() -> Filer {
    Filer::new("bench", Arc::new(MemVfs::new()))
}

/// Segment identity used by the benchmarks.
pub fn bench_info(id: u64) -> SegmentInfo {
    SegmentInfo::new(1, id).with_size_limit(64 * 1024 * 1024)
}
