//! Crash recovery testing for segwal.
//!
//! This module simulates crashes while a tail segment is being written and
//! verifies that recovery yields exactly the records that were safely
//! written.
//!
//! ## Test Strategy
//!
//! 1. **Crash before or inside the header write** - recovery starts fresh,
//!    with or without preallocation
//! 2. **Crash mid-frame** - the torn frame is discarded
//! 3. **Crash after a frame header** - the frame fails its checksum
//! 4. **Failed sync** - recovered records are a prefix of those appended
//!
//! ## Usage
//!
//! ```rust
//! use segwal_testkit::crash::{CrashPoint, CrashRecoveryHarness};
//!
//! let harness = CrashRecoveryHarness::new(8, 32);
//! let result = harness.run(CrashPoint::MidFrame);
//! assert!(result.passed, "{result:?}");
//! ```

use segwal_core::{encoded_len, Filer, SegmentInfo, HEADER_LEN};
use segwal_storage::{MemVfs, ReadableFile, StorageError, StorageResult, Vfs, WritableFile};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::fixtures::{payloads, TEST_DIR};

/// Points at which a crash can be simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashPoint {
    /// Crash before any byte of the header reaches the file.
    BeforeHeaderCommit,
    /// Crash partway through the header write.
    MidHeader,
    /// Crash halfway through a frame.
    MidFrame,
    /// Crash after a frame header, before its payload.
    AfterFrameHeader,
    /// Every sync after segment creation fails.
    SyncFailure,
    /// No crash: the writer is dropped after a final flush.
    CleanShutdown,
}

impl CrashPoint {
    /// All crash points.
    pub const ALL: [CrashPoint; 6] = [
        CrashPoint::BeforeHeaderCommit,
        CrashPoint::MidHeader,
        CrashPoint::MidFrame,
        CrashPoint::AfterFrameHeader,
        CrashPoint::SyncFailure,
        CrashPoint::CleanShutdown,
    ];
}

/// Result of a crash recovery test.
#[derive(Debug, Clone)]
pub struct CrashRecoveryResult {
    /// The crash point that was simulated.
    pub point: CrashPoint,
    /// Whether the test passed.
    pub passed: bool,
    /// Records known durable before the crash.
    pub durable: usize,
    /// Records whose append returned successfully.
    pub acknowledged: usize,
    /// Records found after recovery.
    pub recovered: usize,
    /// Any error message.
    pub error: Option<String>,
}

/// Shared crash state of a [`CrashableVfs`] and its files.
#[derive(Debug)]
struct CrashState {
    /// Bytes that may still be written before the crash.
    budget: AtomicU64,
    crashed: AtomicBool,
    fail_sync: AtomicBool,
}

fn simulated(what: &str) -> StorageError {
    StorageError::Io(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("simulated crash during {what}"),
    ))
}

/// A VFS wrapper that can simulate crashes.
///
/// Writes draw from a shared byte budget. The write that exhausts it is
/// applied only partially, and every later write, resize or sync fails.
#[derive(Clone)]
pub struct CrashableVfs {
    inner: MemVfs,
    state: Arc<CrashState>,
}

impl CrashableVfs {
    /// Creates a new crashable VFS wrapping an in-memory VFS.
    pub fn new(inner: MemVfs) -> Self {
        Self {
            inner,
            state: Arc::new(CrashState {
                budget: AtomicU64::new(u64::MAX),
                crashed: AtomicBool::new(false),
                fail_sync: AtomicBool::new(false),
            }),
        }
    }

    /// Crashes once `bytes` more bytes have been written.
    pub fn crash_after(&self, bytes: u64) {
        self.state.budget.store(bytes, Ordering::SeqCst);
    }

    /// Sets whether sync should fail.
    pub fn set_fail_on_sync(&self, fail: bool) {
        self.state.fail_sync.store(fail, Ordering::SeqCst);
    }

    /// Returns whether the VFS has crashed.
    pub fn has_crashed(&self) -> bool {
        self.state.crashed.load(Ordering::SeqCst)
    }

    /// Returns the wrapped VFS, which sees whatever reached "disk".
    pub fn inner(&self) -> &MemVfs {
        &self.inner
    }

    fn wrap(&self, inner: Box<dyn WritableFile>) -> Box<dyn WritableFile> {
        Box::new(CrashableFile {
            inner,
            state: Arc::clone(&self.state),
        })
    }
}

impl Vfs for CrashableVfs {
    fn create(&self, dir: &Path, name: &str, size: u64) -> StorageResult<Box<dyn WritableFile>> {
        let file = self.inner.create(dir, name, size)?;
        Ok(self.wrap(file))
    }

    fn open_reader(&self, dir: &Path, name: &str) -> StorageResult<Box<dyn ReadableFile>> {
        self.inner.open_reader(dir, name)
    }

    fn open_writer(&self, dir: &Path, name: &str) -> StorageResult<Box<dyn WritableFile>> {
        let file = self.inner.open_writer(dir, name)?;
        Ok(self.wrap(file))
    }

    fn list_dir(&self, dir: &Path) -> StorageResult<Vec<String>> {
        self.inner.list_dir(dir)
    }

    fn delete(&self, dir: &Path, name: &str) -> StorageResult<()> {
        self.inner.delete(dir, name)
    }
}

struct CrashableFile {
    inner: Box<dyn WritableFile>,
    state: Arc<CrashState>,
}

impl CrashableFile {
    fn check(&self, what: &str) -> StorageResult<()> {
        if self.state.crashed.load(Ordering::SeqCst) {
            return Err(simulated(what));
        }
        Ok(())
    }
}

impl ReadableFile for CrashableFile {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<()> {
        self.inner.read_at(offset, buf)
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }
}

impl WritableFile for CrashableFile {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        self.check("write")?;

        let len = data.len() as u64;
        let budget = self.state.budget.load(Ordering::SeqCst);
        if len <= budget {
            self.state.budget.store(budget - len, Ordering::SeqCst);
            return self.inner.write_at(offset, data);
        }

        // Write partial data up to the crash point
        self.state.crashed.store(true, Ordering::SeqCst);
        self.state.budget.store(0, Ordering::SeqCst);
        let partial = budget as usize;
        if partial > 0 {
            let _ = self.inner.write_at(offset, &data[..partial]);
        }
        Err(simulated("partial write"))
    }

    fn set_len(&mut self, len: u64) -> StorageResult<()> {
        self.check("resize")?;
        self.inner.set_len(len)
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.check("sync")?;
        if self.state.fail_sync.load(Ordering::SeqCst) {
            return Err(simulated("sync"));
        }
        self.inner.sync()
    }
}

/// Test harness for crash recovery scenarios.
///
/// Each run writes `records` payloads of `payload_len` bytes to a fresh
/// in-memory tail segment, flushing after every append, crashes at the
/// requested point, then recovers from whatever reached the file.
///
/// Segments are preallocated unless `preallocate` is turned off, in which
/// case the file grows with each write.
#[derive(Debug, Clone)]
pub struct CrashRecoveryHarness {
    /// Records to attempt per run.
    pub records: usize,
    /// Payload size in bytes.
    pub payload_len: usize,
    /// Whether segment files are preallocated to their size limit.
    pub preallocate: bool,
}

impl CrashRecoveryHarness {
    /// Creates a new crash recovery harness.
    pub fn new(records: usize, payload_len: usize) -> Self {
        Self {
            records,
            payload_len,
            preallocate: true,
        }
    }

    /// Sets whether segment files are preallocated.
    #[must_use]
    pub fn with_preallocation(mut self, preallocate: bool) -> Self {
        self.preallocate = preallocate;
        self
    }

    fn info(&self) -> SegmentInfo {
        if !self.preallocate {
            return SegmentInfo::new(1, 1);
        }
        let size = HEADER_LEN + self.records * encoded_len(self.payload_len);
        SegmentInfo::new(1, 1).with_size_limit(u32::try_from(size).unwrap_or(u32::MAX))
    }

    /// Bytes written before the crash for budget-based crash points.
    fn budget(&self, point: CrashPoint) -> Option<u64> {
        let frame = encoded_len(self.payload_len);
        let before = HEADER_LEN + (self.records / 2) * frame;
        match point {
            CrashPoint::BeforeHeaderCommit => Some(0),
            CrashPoint::MidHeader => Some((HEADER_LEN / 2 - 4) as u64),
            CrashPoint::MidFrame => Some((before + frame / 2) as u64),
            CrashPoint::AfterFrameHeader => Some((before + 8) as u64),
            CrashPoint::SyncFailure | CrashPoint::CleanShutdown => None,
        }
    }

    /// Runs one crash scenario.
    pub fn run(&self, point: CrashPoint) -> CrashRecoveryResult {
        let info = self.info();
        let payloads = payloads(self.records, self.payload_len);
        let vfs = CrashableVfs::new(MemVfs::new());
        if let Some(budget) = self.budget(point) {
            vfs.crash_after(budget);
        }

        let mut durable = 0;
        let mut acknowledged = 0;
        {
            let filer = Filer::new(TEST_DIR, Arc::new(vfs.clone()));
            if let Ok(mut writer) = filer.create(&info) {
                if point == CrashPoint::SyncFailure {
                    vfs.set_fail_on_sync(true);
                }
                for payload in &payloads {
                    if writer.append(payload).is_err() {
                        break;
                    }
                    acknowledged += 1;
                    if writer.flush().is_ok() {
                        durable = acknowledged;
                    }
                }
            }
        }

        // Restart over whatever reached the file.
        let filer = Filer::new(TEST_DIR, Arc::new(vfs.inner().clone()));
        let mut result = CrashRecoveryResult {
            point,
            passed: false,
            durable,
            acknowledged,
            recovered: 0,
            error: None,
        };

        let mut writer = match filer.recover_tail(&info) {
            Ok(writer) => writer,
            Err(e) => {
                result.error = Some(format!("recovery failed: {e}"));
                return result;
            }
        };
        result.recovered = writer.len() as usize;

        if result.recovered < durable || result.recovered > acknowledged {
            result.error = Some(format!(
                "recovered {} records, expected between {durable} and {acknowledged}",
                result.recovered
            ));
            return result;
        }
        for (position, expected) in payloads.iter().take(result.recovered).enumerate() {
            match writer.get(position as u64) {
                Ok(ref got) if got == expected => {}
                Ok(_) => {
                    result.error = Some(format!("record {position} differs after recovery"));
                    return result;
                }
                Err(e) => {
                    result.error = Some(format!("record {position} unreadable: {e}"));
                    return result;
                }
            }
        }

        // The recovered writer must accept appends at the recovered tail.
        let next = b"after recovery";
        match writer.append(next).and_then(|pos| writer.get(pos)) {
            Ok(ref got) if got.as_slice() == next => result.passed = true,
            Ok(_) => result.error = Some("append after recovery read back wrong".into()),
            Err(e) => result.error = Some(format!("append after recovery failed: {e}")),
        }
        result
    }

    /// Runs every crash point.
    pub fn run_all(&self) -> Vec<CrashRecoveryResult> {
        CrashPoint::ALL.iter().map(|&p| self.run(p)).collect()
    }
}
