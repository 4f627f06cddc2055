//! Segment writer: appends, durability and sealing.

use crate::error::{SegmentError, SegmentResult};
use crate::segment::frame::{encode_frame, encoded_len};
use crate::segment::header::encode_header;
use crate::segment::load::{load_segment, read_frame, OpenMode};
use crate::segment::pool::BufferPool;
use crate::types::SegmentInfo;
use segwal_storage::WritableFile;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle state of a [`SegmentWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// The file exists but its header is not durable yet.
    Fresh,
    /// Header committed; appends are accepted.
    Active,
    /// Sealed; the segment is immutable.
    Sealed,
}

/// Appends records to one segment file.
///
/// A writer exclusively owns its file handle. Appends are issued by a single
/// logical appender; `&mut self` on every mutating call makes that explicit.
///
/// # Durability
///
/// `append` only hands bytes to the storage layer. Records become durable
/// when [`flush`](Self::flush) or [`seal`](Self::seal) returns (or after each
/// append with `sync_on_append`).
pub struct SegmentWriter {
    info: SegmentInfo,
    name: String,
    file: Box<dyn WritableFile>,
    pool: Arc<BufferPool>,
    state: WriterState,
    /// Start offset of every record.
    offsets: Vec<u64>,
    /// Offset where the next frame goes.
    tail: u64,
    sync_on_append: bool,
}

impl SegmentWriter {
    /// Starts a writer over a newly created, preallocated file and commits
    /// the header before returning.
    pub(crate) fn create(
        info: SegmentInfo,
        name: String,
        file: Box<dyn WritableFile>,
        pool: Arc<BufferPool>,
        sync_on_append: bool,
    ) -> SegmentResult<Self> {
        let mut writer = Self::load(
            OpenMode::Fresh,
            info,
            name,
            file,
            pool,
            sync_on_append,
        )?;
        writer.activate()?;
        info!(segment = %writer.name, "created segment");
        Ok(writer)
    }

    /// Reopens an unsealed tail segment after a restart.
    ///
    /// Frames are scanned from just after the header until the first one
    /// that is incomplete or fails its checksum. Everything from there on is
    /// discarded and zeroed so it can never reappear on a later recovery.
    pub(crate) fn recover(
        info: SegmentInfo,
        name: String,
        file: Box<dyn WritableFile>,
        pool: Arc<BufferPool>,
        sync_on_append: bool,
    ) -> SegmentResult<Self> {
        Self::load(
            OpenMode::Recovering,
            info,
            name,
            file,
            pool,
            sync_on_append,
        )
    }

    fn load(
        mode: OpenMode,
        info: SegmentInfo,
        name: String,
        mut file: Box<dyn WritableFile>,
        pool: Arc<BufferPool>,
        sync_on_append: bool,
    ) -> SegmentResult<Self> {
        let loaded = load_segment(mode, &info, &*file, &pool, false)?;

        if mode == OpenMode::Recovering {
            if loaded.torn {
                warn!(
                    segment = %name,
                    records = loaded.offsets.len(),
                    tail = loaded.tail,
                    "discarding partially written frame"
                );
            }
            if loaded.file_len > loaded.tail {
                let len = loaded.file_len.max(u64::from(info.size_limit));
                file.set_len(loaded.tail)?;
                file.set_len(len)?;
                file.sync()?;
            }
            info!(
                segment = %name,
                records = loaded.offsets.len(),
                tail = loaded.tail,
                header_committed = loaded.header_committed,
                "recovered tail segment"
            );
        }

        let state = if loaded.header_committed {
            WriterState::Active
        } else {
            WriterState::Fresh
        };

        Ok(Self {
            info,
            name,
            file,
            pool,
            state,
            offsets: loaded.offsets,
            tail: loaded.tail,
            sync_on_append,
        })
    }

    /// Writes and syncs the header if it is not committed yet.
    fn activate(&mut self) -> SegmentResult<()> {
        if self.state == WriterState::Fresh {
            self.file.write_at(0, &encode_header(&self.info))?;
            self.file.sync()?;
            self.state = WriterState::Active;
            debug!(segment = %self.name, "committed segment header");
        }
        Ok(())
    }

    fn ensure_writable(&mut self) -> SegmentResult<()> {
        if self.state == WriterState::Sealed {
            return Err(SegmentError::Sealed);
        }
        self.activate()
    }

    /// Appends a record and returns its position within the segment.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::Sealed`] after [`seal`](Self::seal),
    /// [`SegmentError::PayloadTooLarge`] for payloads over 4 GiB, or a storage
    /// error. A failed append, including a failed sync with `sync_on_append`,
    /// leaves the tail where it was, so a retry reuses the same position.
    pub fn append(&mut self, payload: &[u8]) -> SegmentResult<u64> {
        self.ensure_writable()?;

        let mut buf = self.pool.checkout();
        encode_frame(payload, &mut buf)?;
        self.file.write_at(self.tail, &buf)?;
        drop(buf);

        if self.sync_on_append {
            self.file.sync()?;
        }

        let position = self.offsets.len() as u64;
        self.offsets.push(self.tail);
        self.tail += encoded_len(payload.len()) as u64;
        Ok(position)
    }

    /// Appends several records with a single write.
    ///
    /// Returns the range of positions assigned to them.
    ///
    /// # Errors
    ///
    /// Same as [`append`](Self::append). Either all records are appended or
    /// none are.
    pub fn append_batch<I, P>(&mut self, payloads: I) -> SegmentResult<Range<u64>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[u8]>,
    {
        self.ensure_writable()?;

        let first = self.offsets.len() as u64;
        let mut starts = Vec::new();
        let mut buf = self.pool.checkout();
        for payload in payloads {
            starts.push(self.tail + buf.len() as u64);
            encode_frame(payload.as_ref(), &mut buf)?;
        }
        if starts.is_empty() {
            return Ok(first..first);
        }

        self.file.write_at(self.tail, &buf)?;
        let written = buf.len() as u64;
        drop(buf);

        if self.sync_on_append {
            self.file.sync()?;
        }

        self.offsets.extend_from_slice(&starts);
        self.tail += written;
        Ok(first..self.offsets.len() as u64)
    }

    /// Makes every record appended so far durable.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the sync fails.
    pub fn flush(&mut self) -> SegmentResult<()> {
        self.activate()?;
        self.file.sync()?;
        Ok(())
    }

    /// Seals the segment.
    ///
    /// Unused preallocated space is cut off so the sealed file ends exactly
    /// after its last frame, then everything is synced. No further appends
    /// are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::Sealed`] if already sealed, or a storage error.
    pub fn seal(&mut self) -> SegmentResult<()> {
        self.ensure_writable()?;
        self.file.set_len(self.tail)?;
        self.file.sync()?;
        self.state = WriterState::Sealed;
        info!(
            segment = %self.name,
            records = self.offsets.len(),
            size = self.tail,
            "sealed segment"
        );
        Ok(())
    }

    /// Reads back a record written to this segment.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::RecordNotFound`] if `position` has not been
    /// written, or [`SegmentError::ChecksumMismatch`] if the stored frame is
    /// damaged.
    pub fn get(&self, position: u64) -> SegmentResult<Vec<u8>> {
        let (start, end) = self.frame_bounds(position)?;
        let mut out = Vec::new();
        read_frame(&*self.file, &self.pool, position, start, end, &mut out)?;
        Ok(out)
    }

    fn frame_bounds(&self, position: u64) -> SegmentResult<(u64, u64)> {
        let len = self.offsets.len() as u64;
        let not_found = || SegmentError::RecordNotFound { position, len };
        let idx = usize::try_from(position).map_err(|_| not_found())?;
        let start = *self.offsets.get(idx).ok_or_else(not_found)?;
        let end = self.offsets.get(idx + 1).copied().unwrap_or(self.tail);
        Ok((start, end))
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

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Returns the number of records in the segment.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.offsets.len() as u64
    }

    /// Returns true if no records have been appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Returns the offset where the next frame will be written.
    #[must_use]
    pub fn tail_offset(&self) -> u64 {
        self.tail
    }

    /// Returns the logical index of the last record, if any.
    #[must_use]
    pub fn last_index(&self) -> Option<u64> {
        self.len().checked_sub(1).map(|n| self.info.base_index + n)
    }

    /// Returns true once the segment has reached its size limit.
    ///
    /// The limit is soft: appends still succeed past it, the log manager is
    /// expected to roll over to a new segment.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.info.size_limit > 0 && self.tail >= u64::from(self.info.size_limit)
    }
}

impl std::fmt::Debug for SegmentWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentWriter")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("records", &self.offsets.len())
            .field("tail", &self.tail)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::header::HEADER_LEN;
    use segwal_storage::{MemVfs, Vfs};
    use std::path::Path;

    const DIR: &str = "wal";
    const NAME: &str = "seg.wal";

    fn dir() -> &'static Path {
        Path::new(DIR)
    }

    fn pool() -> Arc<BufferPool> {
        Arc::new(BufferPool::new(256, 4))
    }

    fn info() -> SegmentInfo {
        SegmentInfo::new(100, 1).with_size_limit(4096)
    }

    fn create(vfs: &MemVfs) -> SegmentWriter {
        let file = vfs.create(dir(), NAME, 4096).unwrap();
        SegmentWriter::create(info(), NAME.into(), file, pool(), false).unwrap()
    }

    fn recover(vfs: &MemVfs) -> SegmentWriter {
        let file = vfs.open_writer(dir(), NAME).unwrap();
        SegmentWriter::recover(info(), NAME.into(), file, pool(), false).unwrap()
    }

    #[test]
    fn create_commits_header() {
        let vfs = MemVfs::new();
        let writer = create(&vfs);

        assert_eq!(writer.state(), WriterState::Active);
        assert_eq!(writer.tail_offset(), HEADER_LEN as u64);
        let data = vfs.file_data(dir(), NAME).unwrap();
        assert_eq!(&data[..HEADER_LEN], &encode_header(&info()));
    }

    #[test]
    fn append_assigns_positions() {
        let vfs = MemVfs::new();
        let mut writer = create(&vfs);

        assert_eq!(writer.append(b"first").unwrap(), 0);
        assert_eq!(writer.append(b"second").unwrap(), 1);
        assert_eq!(writer.len(), 2);
        assert_eq!(writer.last_index(), Some(101));
        assert_eq!(
            writer.tail_offset(),
            (HEADER_LEN + encoded_len(5) + encoded_len(6)) as u64
        );
    }

    #[test]
    fn get_reads_tail_records() {
        let vfs = MemVfs::new();
        let mut writer = create(&vfs);
        writer.append(b"alpha").unwrap();
        writer.append(b"").unwrap();
        writer.append(b"gamma").unwrap();

        assert_eq!(writer.get(0).unwrap(), b"alpha");
        assert_eq!(writer.get(1).unwrap(), b"");
        assert_eq!(writer.get(2).unwrap(), b"gamma");
        assert!(matches!(
            writer.get(3),
            Err(SegmentError::RecordNotFound { position: 3, len: 3 })
        ));
    }

    #[test]
    fn append_batch_is_one_range() {
        let vfs = MemVfs::new();
        let mut writer = create(&vfs);
        writer.append(b"solo").unwrap();

        let range = writer.append_batch([&b"a"[..], b"bb", b"ccc"]).unwrap();
        assert_eq!(range, 1..4);
        assert_eq!(writer.get(2).unwrap(), b"bb");
        assert_eq!(writer.get(3).unwrap(), b"ccc");

        let empty: [&[u8]; 0] = [];
        assert_eq!(writer.append_batch(empty).unwrap(), 4..4);
    }

    #[test]
    fn seal_truncates_and_blocks_appends() {
        let vfs = MemVfs::new();
        let mut writer = create(&vfs);
        writer.append(b"data").unwrap();
        writer.seal().unwrap();

        assert_eq!(writer.state(), WriterState::Sealed);
        let data = vfs.file_data(dir(), NAME).unwrap();
        assert_eq!(data.len() as u64, writer.tail_offset());

        assert!(matches!(writer.append(b"more"), Err(SegmentError::Sealed)));
        assert!(matches!(writer.seal(), Err(SegmentError::Sealed)));
        assert_eq!(writer.get(0).unwrap(), b"data");
    }

    #[test]
    fn recover_resumes_after_clean_flush() {
        let vfs = MemVfs::new();
        {
            let mut writer = create(&vfs);
            writer.append(b"one").unwrap();
            writer.append(b"two").unwrap();
            writer.flush().unwrap();
        }

        let mut writer = recover(&vfs);
        assert_eq!(writer.state(), WriterState::Active);
        assert_eq!(writer.len(), 2);
        assert_eq!(writer.append(b"three").unwrap(), 2);
        assert_eq!(writer.get(1).unwrap(), b"two");
        assert_eq!(writer.get(2).unwrap(), b"three");
    }

    #[test]
    fn recover_discards_torn_frame() {
        let vfs = MemVfs::new();
        let intact_tail;
        {
            let mut writer = create(&vfs);
            writer.append(b"kept").unwrap();
            intact_tail = writer.tail_offset();
            writer.append(b"torn record").unwrap();
        }
        vfs.truncate_file(dir(), NAME, intact_tail + 5).unwrap();

        let mut writer = recover(&vfs);
        assert_eq!(writer.len(), 1);
        assert_eq!(writer.tail_offset(), intact_tail);
        assert!(writer.get(1).is_err());

        // The discarded region is zeroed and the file regrows to its limit.
        let data = vfs.file_data(dir(), NAME).unwrap();
        assert_eq!(data.len(), 4096);
        assert!(data[intact_tail as usize..].iter().all(|&b| b == 0));

        assert_eq!(writer.append(b"replacement").unwrap(), 1);
        assert_eq!(writer.get(1).unwrap(), b"replacement");
    }

    #[test]
    fn recover_blank_file_starts_fresh() {
        let vfs = MemVfs::new();
        vfs.create(dir(), NAME, 4096).unwrap();

        let mut writer = recover(&vfs);
        assert_eq!(writer.state(), WriterState::Fresh);
        assert!(writer.is_empty());

        writer.append(b"first").unwrap();
        assert_eq!(writer.state(), WriterState::Active);
        let data = vfs.file_data(dir(), NAME).unwrap();
        assert_eq!(&data[..HEADER_LEN], &encode_header(&info()));
    }

    #[test]
    fn is_full_tracks_size_limit() {
        let vfs = MemVfs::new();
        let mut writer = create(&vfs);
        assert!(!writer.is_full());
        writer.append(&[7u8; 4096]).unwrap();
        assert!(writer.is_full());
        // Soft limit: appends still work.
        writer.append(b"over").unwrap();
    }

    #[test]
    fn sync_on_append_writes_through() {
        let vfs = MemVfs::new();
        let file = vfs.create(dir(), NAME, 0).unwrap();
        let mut writer =
            SegmentWriter::create(info(), NAME.into(), file, pool(), true).unwrap();
        writer.append(b"durable").unwrap();
        assert_eq!(writer.get(0).unwrap(), b"durable");
    }
}
