//! Virtual file system trait definitions.

use crate::error::StorageResult;
use std::path::Path;

/// A file opened for reading.
///
/// Files are **opaque byte stores**. Reads are positioned; there is no
/// shared cursor, so a single handle can serve concurrent readers.
pub trait ReadableFile: Send + Sync {
    /// Fills `buf` with the bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::ReadPastEnd`] if fewer than
    /// `buf.len()` bytes exist at `offset`, or an I/O error.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> StorageResult<()>;

    /// Returns the current size of the file in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;
}

/// A file opened for reading and writing.
///
/// # Invariants
///
/// - `write_at` never makes data durable on its own
/// - after `sync` returns, all previous writes and length changes survive
///   process termination
pub trait WritableFile: ReadableFile {
    /// Writes all of `data` at `offset`, extending the file if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()>;

    /// Sets the file length, truncating or zero-extending it.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn set_len(&mut self, len: u64) -> StorageResult<()>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;
}

/// A directory-oriented file system.
///
/// All operations are synchronous. Missing files are reported as
/// [`crate::StorageError::NotFound`] so callers can tell "nothing there" from
/// real failures.
///
/// # Implementors
///
/// - [`super::MemVfs`] - For testing
/// - [`super::FsVfs`] - For persistent storage
pub trait Vfs: Send + Sync {
    /// Atomically creates a new file preallocated to `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::AlreadyExists`] if `name` exists in
    /// `dir`, or an I/O error.
    fn create(&self, dir: &Path, name: &str, size: u64) -> StorageResult<Box<dyn WritableFile>>;

    /// Opens an existing file read-only.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::NotFound`] if the file is missing.
    fn open_reader(&self, dir: &Path, name: &str) -> StorageResult<Box<dyn ReadableFile>>;

    /// Opens an existing file for reading and writing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::NotFound`] if the file is missing.
    fn open_writer(&self, dir: &Path, name: &str) -> StorageResult<Box<dyn WritableFile>>;

    /// Lists the names of all entries in `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    fn list_dir(&self, dir: &Path) -> StorageResult<Vec<String>>;

    /// Deletes a file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::NotFound`] if the file is missing.
    fn delete(&self, dir: &Path, name: &str) -> StorageResult<()>;
}
