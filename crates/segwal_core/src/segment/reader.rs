//! Read-only access to sealed segments.

use crate::error::{SegmentError, SegmentResult};
use crate::segment::load::{load_segment, read_frame, OpenMode};
use crate::segment::pool::BufferPool;
use crate::types::SegmentInfo;
use segwal_storage::ReadableFile;
use std::sync::Arc;
use tracing::debug;

/// Random access reader over a sealed segment.
///
/// The frame index is built once at open; every `get` is then a single
/// positioned read. A reader holds no mutable state, so it can be shared
/// across threads behind an `Arc` and queried concurrently.
pub struct SegmentReader {
    info: SegmentInfo,
    name: String,
    file: Box<dyn ReadableFile>,
    pool: Arc<BufferPool>,
    offsets: Vec<u64>,
    end: u64,
}

impl SegmentReader {
    pub(crate) fn open(
        info: SegmentInfo,
        name: String,
        file: Box<dyn ReadableFile>,
        pool: Arc<BufferPool>,
        verify: bool,
    ) -> SegmentResult<Self> {
        let loaded = load_segment(OpenMode::SealedRead, &info, &*file, &pool, verify)?;
        debug!(
            segment = %name,
            records = loaded.offsets.len(),
            verified = verify,
            "opened sealed segment"
        );
        Ok(Self {
            info,
            name,
            file,
            pool,
            offsets: loaded.offsets,
            end: loaded.tail,
        })
    }

    /// Returns the payload of the record at `position`.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::RecordNotFound`] if `position >= len()`, or
    /// [`SegmentError::ChecksumMismatch`] if the frame is damaged.
    pub fn get(&self, position: u64) -> SegmentResult<Vec<u8>> {
        let mut out = Vec::new();
        self.get_into(position, &mut out)?;
        Ok(out)
    }

    /// Like [`get`](Self::get), but copies the payload into `out`, replacing
    /// its contents.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get). `out` is left untouched on error.
    pub fn get_into(&self, position: u64, out: &mut Vec<u8>) -> SegmentResult<()> {
        let len = self.len();
        let not_found = || SegmentError::RecordNotFound { position, len };
        let idx = usize::try_from(position).map_err(|_| not_found())?;
        let start = *self.offsets.get(idx).ok_or_else(not_found)?;
        let end = self.offsets.get(idx + 1).copied().unwrap_or(self.end);
        read_frame(&*self.file, &self.pool, position, start, end, out)
    }

    /// Iterates over every record in order.
    pub fn iter(&self) -> Records<'_> {
        Records {
            reader: self,
            next: 0,
        }
    }

    /// Returns the segment identity.
    #[must_use]
    pub fn info(&self) -> &SegmentInfo {
        &self.info
    }

    /// Returns the file name of the segment.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.offsets.len() as u64
    }

    /// Returns true if the segment holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Returns the logical index of the first record, if any.
    #[must_use]
    pub fn first_index(&self) -> Option<u64> {
        (!self.is_empty()).then_some(self.info.base_index)
    }

    /// Returns the logical index of the last record, if any.
    #[must_use]
    pub fn last_index(&self) -> Option<u64> {
        self.len().checked_sub(1).map(|n| self.info.base_index + n)
    }

    /// Returns the total size of the segment in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.end
    }
}

impl std::fmt::Debug for SegmentReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentReader")
            .field("name", &self.name)
            .field("records", &self.offsets.len())
            .field("size", &self.end)
            .finish_non_exhaustive()
    }
}

/// Iterator over the records of a [`SegmentReader`].
///
/// Yields `(position, payload)` pairs. A damaged frame yields an error and
/// iteration continues with the next one.
#[derive(Debug)]
pub struct Records<'a> {
    reader: &'a SegmentReader,
    next: u64,
}

impl Iterator for Records<'_> {
    type Item = SegmentResult<(u64, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.reader.len() {
            return None;
        }
        let position = self.next;
        self.next += 1;
        Some(self.reader.get(position).map(|payload| (position, payload)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = usize::try_from(self.reader.len() - self.next).unwrap_or(usize::MAX);
        (left, Some(left))
    }
}
