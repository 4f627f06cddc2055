//! Test fixtures and filer helpers.
//!
//! Provides convenience functions for setting up segment directories
//! and common test scenarios.

use segwal_core::{file_name, Filer, SegmentConfig, SegmentInfo, SegmentReader};
use segwal_storage::{FsVfs, MemVfs};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Directory name used by in-memory fixtures.
pub const TEST_DIR: &str = "wal";

/// Size limit used by [`sample_info`].
pub const TEST_SIZE_LIMIT: u32 = 64 * 1024;

/// A test filer with automatic cleanup.
pub struct TestFiler {
    /// The filer instance.
    pub filer: Filer,
    /// The in-memory VFS, for inspecting or damaging files.
    mem: Option<MemVfs>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestFiler {
    /// Creates a filer over an in-memory VFS.
    pub fn memory() -> Self {
        Self::memory_with_config(SegmentConfig::default())
    }

    /// Creates a filer over an in-memory VFS with a custom configuration.
    pub fn memory_with_config(config: SegmentConfig) -> Self {
        let vfs = MemVfs::new();
        Self {
            filer: Filer::with_config(TEST_DIR, Arc::new(vfs.clone()), config),
            mem: Some(vfs),
            _temp_dir: None,
        }
    }

    /// Creates a filer over a temporary directory on disk.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let filer = Filer::new(temp_dir.path().join(TEST_DIR), Arc::new(FsVfs::new()));
        Self {
            filer,
            mem: None,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the in-memory VFS, or None for on-disk filers.
    pub fn mem(&self) -> Option<&MemVfs> {
        self.mem.as_ref()
    }

    /// Returns the raw bytes of a segment file (in-memory filers only).
    pub fn segment_bytes(&self, info: &SegmentInfo) -> Option<Vec<u8>> {
        self.mem.as_ref()?.file_data(self.filer.dir(), &file_name(info))
    }
}

impl std::ops::Deref for TestFiler {
    type Target = Filer;

    fn deref(&self) -> &Self::Target {
        &self.filer
    }
}

/// Runs a test with a filer over an in-memory VFS.
///
/// # Example
///
/// ```rust
/// use segwal_testkit::{sample_info, with_mem_filer};
///
/// with_mem_filer(|filer| {
///     let mut writer = filer.create(&sample_info(1, 1)).unwrap();
///     writer.append(b"hello").unwrap();
/// });
/// ```
pub fn with_mem_filer<F, R>(f: F) -> R
where
    F: FnOnce(&Filer) -> R,
{
    let test_filer = TestFiler::memory();
    f(&test_filer.filer)
}

/// Runs a test with a filer over a temporary directory.
pub fn with_file_filer<F, R>(f: F) -> R
where
    F: FnOnce(&Filer, &Path) -> R,
{
    let test_filer = TestFiler::file();
    f(&test_filer.filer, test_filer.filer.dir())
}

/// Returns a segment identity with [`TEST_SIZE_LIMIT`] preallocation.
pub fn sample_info(base_index: u64, id: u64) -> SegmentInfo {
    SegmentInfo::new(base_index, id).with_size_limit(TEST_SIZE_LIMIT)
}

/// Deterministic payload number `i` of `len` bytes.
///
/// Distinct `i` give distinct payloads as long as `len >= 8`.
pub fn payload(i: u64, len: usize) -> Vec<u8> {
    let seed = i.to_le_bytes();
    (0..len)
        .map(|j| seed[j % seed.len()] ^ (j / seed.len()) as u8)
        .collect()
}

/// Returns `count` deterministic payloads of `len` bytes.
pub fn payloads(count: usize, len: usize) -> Vec<Vec<u8>> {
    (0..count as u64).map(|i| payload(i, len)).collect()
}

/// Creates, fills and seals a segment, then opens it for reading.
pub fn sealed_segment(filer: &Filer, info: &SegmentInfo, payloads: &[Vec<u8>]) -> SegmentReader {
    let mut writer = filer.create(info).expect("Failed to create segment");
    writer
        .append_batch(payloads)
        .expect("Failed to append payloads");
    writer.seal().expect("Failed to seal segment");
    filer.open(info).expect("Failed to open sealed segment")
}

/// Flips the bits of `mask` in the byte at `offset` of an in-memory file.
pub fn corrupt_byte(vfs: &MemVfs, dir: &Path, name: &str, offset: usize, mask: u8) {
    let mut data = vfs.file_data(dir, name).expect("File to corrupt must exist");
    data[offset] ^= mask;
    vfs.set_file_data(dir, name, data);
}

#[cfg(test)]
mod tests {
    use super::*;
    use segwal_core::{encoded_len, HEADER_LEN};

    #[test]
    fn memory_filer_round_trip() {
        let test_filer = TestFiler::memory();
        let info = sample_info(1, 1);
        let reader = sealed_segment(&test_filer, &info, &payloads(4, 32));
        assert_eq!(reader.len(), 4);
        assert_eq!(reader.get(3).unwrap(), payload(3, 32));

        let bytes = test_filer.segment_bytes(&info).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN + 4 * encoded_len(32));
    }

    #[test]
    fn file_filer_round_trip() {
        with_file_filer(|filer, dir| {
            let info = sample_info(10, 2);
            sealed_segment(filer, &info, &payloads(2, 8));
            assert!(dir.join(file_name(&info)).exists());
        });
    }

    #[test]
    fn payloads_are_distinct() {
        let all = payloads(300, 8);
        let mut sorted = all.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), all.len());
    }

    #[test]
    fn corrupt_byte_breaks_one_record() {
        let test_filer = TestFiler::memory();
        let info = sample_info(1, 1);
        sealed_segment(&test_filer, &info, &payloads(2, 16));

        let offset = HEADER_LEN + encoded_len(16) + 12;
        corrupt_byte(
            test_filer.mem().unwrap(),
            test_filer.dir(),
            &file_name(&info),
            offset,
            0x01,
        );

        let reader = test_filer.open(&info).unwrap();
        assert!(reader.get(0).is_ok());
        assert!(reader.get(1).unwrap_err().is_corruption());
    }
}
