//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The named file does not exist.
    #[error("file not found: {name}")]
    NotFound {
        /// Name of the missing file.
        name: String,
    },

    /// A file with this name already exists.
    #[error("file already exists: {name}")]
    AlreadyExists {
        /// Name of the existing file.
        name: String,
    },

    /// Attempted to read beyond the end of the file.
    #[error("read beyond end of file: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current file size.
        size: u64,
    },

    /// The file handle was closed.
    #[error("file is closed")]
    Closed,
}

impl StorageError {
    /// Returns true if this error means the file does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Returns true if this error is a short read at end of file.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        match self {
            Self::ReadPastEnd { .. } => true,
            Self::Io(e) => e.kind() == io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }

    /// Maps an OS error for `name`, turning "not found" and "already exists"
    /// into their dedicated variants.
    pub(crate) fn from_io(err: io::Error, name: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound {
                name: name.to_string(),
            },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists {
                name: name.to_string(),
            },
            _ => Self::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_detection() {
        let err = StorageError::NotFound {
            name: "x.wal".into(),
        };
        assert!(err.is_not_found());

        let err = StorageError::Io(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(err.is_not_found());

        let err = StorageError::Closed;
        assert!(!err.is_not_found());
    }

    #[test]
    fn from_io_maps_kinds() {
        let err = StorageError::from_io(io::Error::from(io::ErrorKind::AlreadyExists), "a");
        assert!(matches!(err, StorageError::AlreadyExists { .. }));

        let err = StorageError::from_io(io::Error::from(io::ErrorKind::PermissionDenied), "a");
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[test]
    fn eof_detection() {
        let err = StorageError::ReadPastEnd {
            offset: 10,
            len: 4,
            size: 12,
        };
        assert!(err.is_eof());
        assert!(!err.is_not_found());
    }
}
