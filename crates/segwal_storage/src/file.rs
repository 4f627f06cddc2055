//! OS file system implementation of the VFS.

use crate::error::{StorageError, StorageResult};
use crate::vfs::{ReadableFile, Vfs, WritableFile};
use parking_lot::RwLock;
use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A VFS backed by the operating system's file APIs.
///
/// # Durability
///
/// - `create` and `delete` fsync the parent directory (on Unix) so the
///   directory entry change survives a crash
/// - `WritableFile::sync` calls `File::sync_all()`
///
/// # Example
///
/// ```no_run
/// use segwal_storage::{FsVfs, Vfs, WritableFile};
/// use std::path::Path;
///
/// let vfs = FsVfs::new();
/// let mut file = vfs.create(Path::new("wal"), "seg.wal", 4096).unwrap();
/// file.write_at(0, b"persistent data").unwrap();
/// file.sync().unwrap();
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct FsVfs;

impl FsVfs {
    /// Creates a new OS-backed VFS.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Syncs a directory so entry creation, rename or removal is durable.
    #[cfg(unix)]
    fn sync_dir(dir: &Path) -> StorageResult<()> {
        let handle = File::open(dir)?;
        handle.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_dir(_dir: &Path) -> StorageResult<()> {
        // NTFS journals metadata; directory handles cannot be fsynced here.
        Ok(())
    }
}

impl Vfs for FsVfs {
    fn create(&self, dir: &Path, name: &str, size: u64) -> StorageResult<Box<dyn WritableFile>> {
        fs::create_dir_all(dir)?;
        let path = dir.join(name);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| StorageError::from_io(e, name))?;

        if size > 0 {
            file.set_len(size)?;
        }
        file.sync_all()?;
        Self::sync_dir(dir)?;

        debug!(path = %path.display(), size, "created file");
        Ok(Box::new(FsFile::new(path, file, size)))
    }

    fn open_reader(&self, dir: &Path, name: &str) -> StorageResult<Box<dyn ReadableFile>> {
        let path = dir.join(name);
        let file = OpenOptions::new()
            .read(true)
            .open(&path)
            .map_err(|e| StorageError::from_io(e, name))?;
        let size = file.metadata()?.len();
        Ok(Box::new(FsFile::new(path, file, size)))
    }

    fn open_writer(&self, dir: &Path, name: &str) -> StorageResult<Box<dyn WritableFile>> {
        let path = dir.join(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(false)
            .truncate(false)
            .open(&path)
            .map_err(|e| StorageError::from_io(e, name))?;
        let size = file.metadata()?.len();
        Ok(Box::new(FsFile::new(path, file, size)))
    }

    fn list_dir(&self, dir: &Path) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            // Names that are not valid UTF-8 cannot be segment files.
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete(&self, dir: &Path, name: &str) -> StorageResult<()> {
        let path = dir.join(name);
        fs::remove_file(&path).map_err(|e| StorageError::from_io(e, name))?;
        Self::sync_dir(dir)?;
        debug!(path = %path.display(), "deleted file");
        Ok(())
    }
}

/// A single OS file opened through [`FsVfs`].
///
/// The handle is guarded by a lock because positioned I/O is done with
/// seek + read/write; this keeps the type portable and `Sync`.
#[derive(Debug)]
pub struct FsFile {
    path: PathBuf,
    file: RwLock<File>,
    size: RwLock<u64>,
}

impl FsFile {
    fn new(path: PathBuf, file: File, size: u64) -> Self {
        Self {
            path,
            file: RwLock::new(file),
            size: RwLock::new(size),
        }
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Positioned read that leaves the file cursor alone, so readers only need
/// the shared lock.
#[cfg(unix)]
fn read_exact_at(file: &RwLock<File>, offset: u64, buf: &mut [u8]) -> StorageResult<()> {
    use std::os::unix::fs::FileExt;

    file.read().read_exact_at(buf, offset)?;
    Ok(())
}

#[cfg(not(unix))]
fn read_exact_at(file: &RwLock<File>, offset: u64, buf: &mut [u8]) -> StorageResult<()> {
    use std::io::Read;

    let mut file = file.write();
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(buf)?;
    Ok(())
}

impl ReadableFile for FsFile {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<()> {
        let size = *self.size.read();
        let len = buf.len();
        let end = offset.saturating_add(len as u64);

        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        if len == 0 {
            return Ok(());
        }

        read_exact_at(&self.file, offset, buf)
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(*self.size.read())
    }
}

impl WritableFile for FsFile {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        if data.is_empty() {
            return Ok(());
        }

        let mut file = self.file.write();
        let mut size = self.size.write();

        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        *size = (*size).max(offset + data.len() as u64);
        Ok(())
    }

    fn set_len(&mut self, len: u64) -> StorageResult<()> {
        let file = self.file.write();
        let mut size = self.size.write();
        file.set_len(len)?;
        *size = len;
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        let mut file = self.file.write();
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_preallocates() {
        let dir = tempdir().unwrap();
        let vfs = FsVfs::new();

        let file = vfs.create(dir.path(), "a.wal", 1024).unwrap();
        assert_eq!(file.size().unwrap(), 1024);
        assert_eq!(fs::metadata(dir.path().join("a.wal")).unwrap().len(), 1024);
    }

    #[test]
    fn create_existing_fails() {
        let dir = tempdir().unwrap();
        let vfs = FsVfs::new();

        vfs.create(dir.path(), "a.wal", 0).unwrap();
        let result = vfs.create(dir.path(), "a.wal", 0);
        assert!(matches!(result, Err(StorageError::AlreadyExists { .. })));
    }

    #[test]
    fn create_makes_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested").join("wal");
        let vfs = FsVfs::new();

        vfs.create(&nested, "a.wal", 16).unwrap();
        assert!(nested.join("a.wal").exists());
    }

    #[test]
    fn write_and_read_back() {
        let dir = tempdir().unwrap();
        let vfs = FsVfs::new();

        let mut file = vfs.create(dir.path(), "a.wal", 0).unwrap();
        file.write_at(0, b"hello").unwrap();
        file.write_at(5, b" world").unwrap();
        assert_eq!(file.size().unwrap(), 11);

        let mut buf = [0u8; 11];
        file.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"hello world");
    }

    #[test]
    fn concurrent_reads_see_their_own_offsets() {
        let dir = tempdir().unwrap();
        let vfs = FsVfs::new();

        let mut file = vfs.create(dir.path(), "a.wal", 0).unwrap();
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        file.write_at(0, &data).unwrap();
        file.sync().unwrap();

        let reader = vfs.open_reader(dir.path(), "a.wal").unwrap();
        std::thread::scope(|s| {
            for t in 0..8usize {
                let (reader, data) = (&reader, &data);
                s.spawn(move || {
                    let mut buf = [0u8; 64];
                    for round in 0..200usize {
                        let offset = (t * 509 + round * 61) % (data.len() - buf.len());
                        reader.read_at(offset as u64, &mut buf).unwrap();
                        assert_eq!(&buf[..], &data[offset..offset + buf.len()]);
                    }
                });
            }
        });
    }

    #[test]
    fn read_past_end_fails() {
        let dir = tempdir().unwrap();
        let vfs = FsVfs::new();

        let mut file = vfs.create(dir.path(), "a.wal", 0).unwrap();
        file.write_at(0, b"hello").unwrap();

        let mut buf = [0u8; 5];
        let result = file.read_at(3, &mut buf);
        assert!(matches!(result, Err(StorageError::ReadPastEnd { .. })));
    }

    #[test]
    fn persistence_across_reopen() {
        let dir = tempdir().unwrap();
        let vfs = FsVfs::new();

        {
            let mut file = vfs.create(dir.path(), "a.wal", 64).unwrap();
            file.write_at(8, b"persistent").unwrap();
            file.sync().unwrap();
        }

        let reader = vfs.open_reader(dir.path(), "a.wal").unwrap();
        assert_eq!(reader.size().unwrap(), 64);
        let mut buf = [0u8; 10];
        reader.read_at(8, &mut buf).unwrap();
        assert_eq!(&buf, b"persistent");
    }

    #[test]
    fn set_len_truncates_and_zero_extends() {
        let dir = tempdir().unwrap();
        let vfs = FsVfs::new();

        let mut file = vfs.create(dir.path(), "a.wal", 0).unwrap();
        file.write_at(0, b"abcdef").unwrap();
        file.set_len(3).unwrap();
        file.set_len(6).unwrap();

        let mut buf = [0xFFu8; 6];
        file.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"abc\0\0\0");
    }

    #[test]
    fn open_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let vfs = FsVfs::new();

        let result = vfs.open_reader(dir.path(), "missing.wal");
        assert!(matches!(result, Err(StorageError::NotFound { .. })));

        let result = vfs.open_writer(dir.path(), "missing.wal");
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn list_and_delete() {
        let dir = tempdir().unwrap();
        let vfs = FsVfs::new();

        vfs.create(dir.path(), "b.wal", 0).unwrap();
        vfs.create(dir.path(), "a.wal", 0).unwrap();
        assert_eq!(vfs.list_dir(dir.path()).unwrap(), vec!["a.wal", "b.wal"]);

        vfs.delete(dir.path(), "a.wal").unwrap();
        assert_eq!(vfs.list_dir(dir.path()).unwrap(), vec!["b.wal"]);

        let result = vfs.delete(dir.path(), "a.wal");
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }
}
