//! Error types for segwal core.

use segwal_storage::StorageError;
use thiserror::Error;

/// Result type for segment operations.
pub type SegmentResult<T> = Result<T, SegmentError>;

/// Broad classification of a [`SegmentError`].
///
/// The log manager decides its policy (start fresh, repair, abort) from the
/// kind, not from the individual variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Expected segment file or requested record is absent.
    NotFound,
    /// On-disk content violates the format's structure or checksums.
    Corruption,
    /// A well-formed header belongs to a different segment than expected.
    Validation,
    /// The call is not permitted with these arguments or in this state.
    InvalidOperation,
    /// Any other failure from the storage layer.
    Io,
}

/// Errors that can occur in segment operations.
#[derive(Debug, Error)]
pub enum SegmentError {
    /// Storage layer error, propagated unchanged.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The segment file does not exist.
    #[error("segment not found: {name}")]
    SegmentNotFound {
        /// File name of the missing segment.
        name: String,
    },

    /// The requested record position is outside the segment.
    #[error("record {position} not found: segment holds {len} records")]
    RecordNotFound {
        /// Requested in-segment position.
        position: u64,
        /// Number of records in the segment.
        len: u64,
    },

    /// Segment content is structurally invalid.
    #[error("segment corruption: {message}")]
    Corruption {
        /// Description of the corruption.
        message: String,
    },

    /// A record's stored checksum does not match its contents.
    #[error("checksum mismatch at record {position}: stored {expected:08x}, computed {actual:08x}")]
    ChecksumMismatch {
        /// In-segment position of the damaged record.
        position: u64,
        /// Checksum stored in the frame.
        expected: u32,
        /// Checksum computed over the bytes read.
        actual: u32,
    },

    /// The header carries a format version this build cannot read.
    #[error("unsupported segment format version {version}")]
    UnsupportedVersion {
        /// Version byte found in the header.
        version: u8,
    },

    /// The header does not describe the expected segment.
    #[error("segment header mismatch: {field} is {actual}, expected {expected}")]
    HeaderMismatch {
        /// Name of the mismatching header field.
        field: &'static str,
        /// Value the caller expected.
        expected: u64,
        /// Value found in the file.
        actual: u64,
    },

    /// An argument is invalid.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// The segment is sealed and no longer accepts writes.
    #[error("segment is sealed")]
    Sealed,

    /// A payload does not fit in a frame.
    #[error("payload too large: {len} bytes exceeds frame limit of {} bytes", u32::MAX)]
    PayloadTooLarge {
        /// Payload length in bytes.
        len: usize,
    },
}

impl SegmentError {
    /// Creates a corruption error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Maps a storage error raised while opening `name`, turning a missing
    /// file into [`SegmentError::SegmentNotFound`].
    pub(crate) fn from_open(err: StorageError, name: &str) -> Self {
        if err.is_not_found() {
            Self::SegmentNotFound {
                name: name.to_string(),
            }
        } else {
            Self::Storage(err)
        }
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SegmentNotFound { .. } | Self::RecordNotFound { .. } => ErrorKind::NotFound,
            Self::Storage(e) if e.is_not_found() => ErrorKind::NotFound,
            Self::Storage(_) => ErrorKind::Io,
            Self::Corruption { .. }
            | Self::ChecksumMismatch { .. }
            | Self::UnsupportedVersion { .. } => ErrorKind::Corruption,
            Self::HeaderMismatch { .. } => ErrorKind::Validation,
            Self::InvalidArgument { .. } | Self::Sealed | Self::PayloadTooLarge { .. } => {
                ErrorKind::InvalidOperation
            }
        }
    }

    /// Returns true for [`ErrorKind::NotFound`] errors.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns true for [`ErrorKind::Corruption`] errors.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        self.kind() == ErrorKind::Corruption
    }
}
