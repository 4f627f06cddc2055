//! Stress tests for segwal.
//!
//! These tests verify behavior under sustained appends and concurrent reads.

use crate::fixtures::payload;
use rand::Rng;
use segwal_core::{Filer, SegmentInfo, SegmentReader, SegmentWriter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform (per thread for concurrent tests).
    pub operations: usize,
    /// Number of concurrent reader threads.
    pub threads: usize,
    /// Size of each payload in bytes.
    pub payload_size: usize,
    /// Number of records in the segment under test.
    pub record_count: usize,
    /// Records per batch for batch appends.
    pub batch_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            payload_size: 256,
            record_count: 1_000,
            batch_size: 32,
        }
    }
}

/// Run a sequential append stress test, rolling to a new segment whenever
/// the tail is full.
pub fn stress_sequential_appends(filer: &Filer, config: &StressConfig) -> StressTestResult {
    let size_limit = u32::try_from(config.record_count * (config.payload_size + 8) + 32)
        .unwrap_or(u32::MAX);

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    let mut next_index = 1u64;
    let mut next_id = 1u64;
    let mut writer: Option<SegmentWriter> = None;

    for i in 0..config.operations {
        if writer.as_ref().map_or(true, SegmentWriter::is_full) {
            if let Some(mut full) = writer.take() {
                if full.seal().is_err() {
                    failed += 1;
                }
            }
            let info = SegmentInfo::new(next_index, next_id).with_size_limit(size_limit);
            next_id += 1;
            match filer.create(&info) {
                Ok(w) => writer = Some(w),
                Err(_) => {
                    failed += 1;
                    continue;
                }
            }
        }
        let Some(w) = writer.as_mut() else { continue };

        match w.append(&payload(i as u64, config.payload_size)) {
            Ok(_) => {
                successful += 1;
                next_index += 1;
            }
            Err(_) => failed += 1,
        }
    }
    if let Some(mut w) = writer {
        if w.seal().is_err() {
            failed += 1;
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a batch append stress test on a single segment.
pub fn stress_batch_appends(
    filer: &Filer,
    info: &SegmentInfo,
    config: &StressConfig,
) -> StressTestResult {
    let batch: Vec<Vec<u8>> = (0..config.batch_size as u64)
        .map(|i| payload(i, config.payload_size))
        .collect();

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    let mut writer = match filer.create(info) {
        Ok(w) => w,
        Err(_) => return StressTestResult::new(0, config.operations, start.elapsed()),
    };
    for _ in 0..config.operations {
        match writer.append_batch(&batch) {
            Ok(range) => successful += (range.end - range.start) as usize,
            Err(_) => failed += 1,
        }
    }
    if writer.flush().is_err() {
        failed += 1;
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run concurrent random reads against one sealed segment.
///
/// Every read is checked against the payload written at that position, so
/// `failed_ops` counts wrong data as well as errors.
pub fn stress_concurrent_reads(
    reader: Arc<SegmentReader>,
    config: &StressConfig,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let len = reader.len();
    let payload_size = config.payload_size;

    let start = Instant::now();
    let handles: Vec<_> = (0..config.threads)
        .map(|_| {
            let reader = Arc::clone(&reader);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let operations = config.operations;

            thread::spawn(move || {
                if len == 0 {
                    return;
                }
                let mut rng = rand::thread_rng();
                let mut buf = Vec::new();
                for _ in 0..operations {
                    let position = rng.gen_range(0..len);
                    match reader.get_into(position, &mut buf) {
                        Ok(()) if buf == payload(position, payload_size) => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        _ => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}
