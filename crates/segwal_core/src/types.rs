//! Core type definitions for segwal.

use std::fmt;

/// Identity and static metadata of one segment.
///
/// `(base_index, id)` is unique within a directory. Two segments may share a
/// `base_index` when a segment is recreated after a truncation; `id` is
/// assigned monotonically by the log manager and breaks the tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentInfo {
    /// Logical index of the first record the segment may hold. Must be > 0.
    pub base_index: u64,
    /// Opaque, monotonically assigned segment identifier.
    pub id: u64,
    /// Identifier of the codec used for record payloads.
    pub codec: u64,
    /// Preallocated capacity in bytes. Not stored in the file header.
    pub size_limit: u32,
}

impl SegmentInfo {
    /// Creates segment info with codec 0 and no preallocation.
    #[must_use]
    pub const fn new(base_index: u64, id: u64) -> Self {
        Self {
            base_index,
            id,
            codec: 0,
            size_limit: 0,
        }
    }

    /// Sets the payload codec identifier.
    #[must_use]
    pub const fn with_codec(mut self, codec: u64) -> Self {
        self.codec = codec;
        self
    }

    /// Sets the preallocation size limit.
    #[must_use]
    pub const fn with_size_limit(mut self, size_limit: u32) -> Self {
        self.size_limit = size_limit;
        self
    }

    /// Returns the key segments are ordered by.
    #[must_use]
    pub const fn sort_key(&self) -> (u64, u64) {
        (self.base_index, self.id)
    }
}

impl fmt::Display for SegmentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seg:{}/{:x}", self.base_index, self.id)
    }
}
