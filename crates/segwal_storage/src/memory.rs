//! In-memory VFS for testing.

use crate::error::{StorageError, StorageResult};
use crate::vfs::{ReadableFile, Vfs, WritableFile};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type FileData = Arc<RwLock<Vec<u8>>>;

/// An in-memory VFS.
///
/// This VFS keeps all files in memory and is suitable for:
/// - Unit tests
/// - Crash simulation: the test helpers ([`MemVfs::file_data`],
///   [`MemVfs::set_file_data`], [`MemVfs::truncate_file`]) change a file's
///   bytes underneath any open handle, exactly as a torn write would
///
/// Cloning a `MemVfs` yields another handle onto the same files.
///
/// # Example
///
/// ```rust
/// use segwal_storage::{MemVfs, Vfs, WritableFile};
/// use std::path::Path;
///
/// let vfs = MemVfs::new();
/// let mut file = vfs.create(Path::new("d"), "f", 0).unwrap();
/// file.write_at(0, b"test data").unwrap();
/// assert_eq!(vfs.file_data(Path::new("d"), "f").unwrap(), b"test data");
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemVfs {
    files: Arc<RwLock<BTreeMap<PathBuf, FileData>>>,
}

impl MemVfs {
    /// Creates a new empty in-memory VFS.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(dir: &Path, name: &str) -> PathBuf {
        dir.join(name)
    }

    fn lookup(&self, dir: &Path, name: &str) -> StorageResult<FileData> {
        self.files
            .read()
            .get(&Self::key(dir, name))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                name: name.to_string(),
            })
    }

    /// Returns a copy of a file's bytes, or `None` if it does not exist.
    #[must_use]
    pub fn file_data(&self, dir: &Path, name: &str) -> Option<Vec<u8>> {
        self.lookup(dir, name).ok().map(|data| data.read().clone())
    }

    /// Replaces a file's bytes, creating the file if needed.
    ///
    /// Useful for planting damaged or misnamed files in tests.
    pub fn set_file_data(&self, dir: &Path, name: &str, bytes: Vec<u8>) {
        let mut files = self.files.write();
        match files.get(&Self::key(dir, name)) {
            Some(data) => *data.write() = bytes,
            None => {
                files.insert(Self::key(dir, name), Arc::new(RwLock::new(bytes)));
            }
        }
    }

    /// Truncates a file to `len` bytes, simulating a torn write.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the file does not exist.
    pub fn truncate_file(&self, dir: &Path, name: &str, len: u64) -> StorageResult<()> {
        let data = self.lookup(dir, name)?;
        data.write().truncate(len as usize);
        Ok(())
    }

    /// Returns the number of files across all directories.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.read().len()
    }
}

impl Vfs for MemVfs {
    fn create(&self, dir: &Path, name: &str, size: u64) -> StorageResult<Box<dyn WritableFile>> {
        let mut files = self.files.write();
        let key = Self::key(dir, name);
        if files.contains_key(&key) {
            return Err(StorageError::AlreadyExists {
                name: name.to_string(),
            });
        }

        let data = Arc::new(RwLock::new(vec![0u8; size as usize]));
        files.insert(key, Arc::clone(&data));
        Ok(Box::new(MemFile { data }))
    }

    fn open_reader(&self, dir: &Path, name: &str) -> StorageResult<Box<dyn ReadableFile>> {
        let data = self.lookup(dir, name)?;
        Ok(Box::new(MemFile { data }))
    }

    fn open_writer(&self, dir: &Path, name: &str) -> StorageResult<Box<dyn WritableFile>> {
        let data = self.lookup(dir, name)?;
        Ok(Box::new(MemFile { data }))
    }

    fn list_dir(&self, dir: &Path) -> StorageResult<Vec<String>> {
        let files = self.files.read();
        let names = files
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .filter_map(|path| path.file_name())
            .filter_map(|name| name.to_str())
            .map(str::to_string)
            .collect();
        Ok(names)
    }

    fn delete(&self, dir: &Path, name: &str) -> StorageResult<()> {
        match self.files.write().remove(&Self::key(dir, name)) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound {
                name: name.to_string(),
            }),
        }
    }
}

/// A file handle into a [`MemVfs`].
///
/// Handles share the underlying bytes; a deleted file stays readable through
/// handles that were already open, as on POSIX systems.
#[derive(Debug)]
pub struct MemFile {
    data: FileData,
}

impl ReadableFile for MemFile {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<()> {
        let data = self.data.read();
        let size = data.len() as u64;
        let len = buf.len();
        let end = offset.saturating_add(len as u64);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        let start = offset as usize;
        buf.copy_from_slice(&data[start..start + len]);
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }
}

impl WritableFile for MemFile {
    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> StorageResult<()> {
        let mut data = self.data.write();
        let start = offset as usize;
        let end = start + bytes.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(bytes);
        Ok(())
    }

    fn set_len(&mut self, len: u64) -> StorageResult<()> {
        self.data.write().resize(len as usize, 0);
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        // Nothing is buffered outside the shared vector.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir() -> &'static Path {
        Path::new("wal")
    }

    #[test]
    fn create_is_zero_filled() {
        let vfs = MemVfs::new();
        let file = vfs.create(dir(), "a", 16).unwrap();
        assert_eq!(file.size().unwrap(), 16);
        assert_eq!(vfs.file_data(dir(), "a").unwrap(), vec![0u8; 16]);
    }

    #[test]
    fn create_existing_fails() {
        let vfs = MemVfs::new();
        vfs.create(dir(), "a", 0).unwrap();
        let result = vfs.create(dir(), "a", 0);
        assert!(matches!(result, Err(StorageError::AlreadyExists { .. })));
    }

    #[test]
    fn write_extends_file() {
        let vfs = MemVfs::new();
        let mut file = vfs.create(dir(), "a", 4).unwrap();
        file.write_at(2, b"hello").unwrap();
        assert_eq!(file.size().unwrap(), 7);
        assert_eq!(vfs.file_data(dir(), "a").unwrap(), b"\0\0hello");
    }

    #[test]
    fn read_at_returns_correct_data() {
        let vfs = MemVfs::new();
        let mut file = vfs.create(dir(), "a", 0).unwrap();
        file.write_at(0, b"hello world").unwrap();

        let reader = vfs.open_reader(dir(), "a").unwrap();
        let mut buf = [0u8; 5];
        reader.read_at(6, &mut buf).unwrap();
        assert_eq!(&buf, b"world");
    }

    #[test]
    fn read_past_end_fails() {
        let vfs = MemVfs::new();
        let mut file = vfs.create(dir(), "a", 0).unwrap();
        file.write_at(0, b"hello").unwrap();

        let mut buf = [0u8; 10];
        let result = file.read_at(3, &mut buf);
        assert!(matches!(result, Err(StorageError::ReadPastEnd { .. })));
    }

    #[test]
    fn empty_read_at_end_succeeds() {
        let vfs = MemVfs::new();
        let file = vfs.create(dir(), "a", 5).unwrap();
        let mut buf = [0u8; 0];
        assert!(file.read_at(5, &mut buf).is_ok());
    }

    #[test]
    fn open_missing_is_not_found() {
        let vfs = MemVfs::new();
        assert!(matches!(
            vfs.open_reader(dir(), "nope"),
            Err(StorageError::NotFound { .. })
        ));
        assert!(matches!(
            vfs.open_writer(dir(), "nope"),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn list_is_scoped_to_directory() {
        let vfs = MemVfs::new();
        vfs.create(dir(), "b", 0).unwrap();
        vfs.create(dir(), "a", 0).unwrap();
        vfs.create(Path::new("other"), "c", 0).unwrap();

        assert_eq!(vfs.list_dir(dir()).unwrap(), vec!["a", "b"]);
        assert_eq!(vfs.file_count(), 3);
    }

    #[test]
    fn delete_missing_is_not_found() {
        let vfs = MemVfs::new();
        vfs.create(dir(), "a", 0).unwrap();
        vfs.delete(dir(), "a").unwrap();
        assert!(matches!(
            vfs.delete(dir(), "a"),
            Err(StorageError::NotFound { .. })
        ));
    }

    #[test]
    fn truncate_is_visible_to_open_handles() {
        let vfs = MemVfs::new();
        let mut file = vfs.create(dir(), "a", 0).unwrap();
        file.write_at(0, b"abcdef").unwrap();

        vfs.truncate_file(dir(), "a", 2).unwrap();
        assert_eq!(file.size().unwrap(), 2);
    }

    #[test]
    fn set_len_zero_extends() {
        let vfs = MemVfs::new();
        let mut file = vfs.create(dir(), "a", 0).unwrap();
        file.write_at(0, b"abc").unwrap();
        file.set_len(1).unwrap();
        file.set_len(3).unwrap();
        assert_eq!(vfs.file_data(dir(), "a").unwrap(), b"a\0\0");
    }

    #[test]
    fn set_file_data_plants_file() {
        let vfs = MemVfs::new();
        vfs.set_file_data(dir(), "planted", b"xyz".to_vec());
        assert_eq!(vfs.list_dir(dir()).unwrap(), vec!["planted"]);
        assert_eq!(vfs.file_data(dir(), "planted").unwrap(), b"xyz");
    }
}
