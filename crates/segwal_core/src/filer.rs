//! Segment directory management.
//!
//! A log directory holds one file per segment:
//!
//! ```text
//! <dir>/
//! ├─ 00000000000000000001-0000000000000001.wal
//! ├─ 00000000000000004096-0000000000000002.wal
//! └─ 00000000000000009120-0000000000000003.wal   # unsealed tail
//! ```
//!
//! Names are `{base_index:020}-{id:016x}.wal`, so lexical order is
//! `(base_index, id)` order. The `.wal` suffix is reserved: any file carrying
//! it must parse.

use crate::config::SegmentConfig;
use crate::error::{SegmentError, SegmentResult};
use crate::segment::{read_header, BufferPool, SegmentReader, SegmentWriter};
use crate::types::SegmentInfo;
use segwal_storage::Vfs;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Suffix of segment file names.
pub const SEGMENT_FILE_SUFFIX: &str = ".wal";

const BASE_DIGITS: usize = 20;
const ID_DIGITS: usize = 16;

/// Returns the file name of the segment `(base_index, id)`.
#[must_use]
pub fn segment_file_name(base_index: u64, id: u64) -> String {
    format!("{base_index:020}-{id:016x}{SEGMENT_FILE_SUFFIX}")
}

/// Returns the file name of the segment described by `info`.
#[must_use]
pub fn file_name(info: &SegmentInfo) -> String {
    segment_file_name(info.base_index, info.id)
}

/// Parses a segment file name back into `(base_index, id)`.
///
/// Only the exact form produced by [`segment_file_name`] is accepted:
/// 20 decimal digits, a dash, 16 lowercase hex digits, then `.wal`.
#[must_use]
pub fn parse_file_name(name: &str) -> Option<(u64, u64)> {
    let stem = name.strip_suffix(SEGMENT_FILE_SUFFIX)?;
    let (base, id) = stem.split_once('-')?;

    let is_lower_hex = |c: char| c.is_ascii_digit() || ('a'..='f').contains(&c);
    if base.len() != BASE_DIGITS || !base.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if id.len() != ID_DIGITS || !id.chars().all(is_lower_hex) {
        return None;
    }

    let base = base.parse::<u64>().ok()?;
    let id = u64::from_str_radix(id, 16).ok()?;
    Some((base, id))
}

/// Creates, opens, recovers, lists and deletes the segments of one
/// directory.
///
/// The filer owns the buffer pool shared by every writer and reader it hands
/// out.
///
/// # Thread Safety
///
/// `open` may be called from many threads. `create`, `delete` and `list` on
/// the same directory must be serialized by the caller; the filer takes no
/// directory lock.
///
/// # Example
///
/// ```rust
/// use segwal_core::{Filer, SegmentInfo};
/// use segwal_storage::MemVfs;
/// use std::sync::Arc;
///
/// let filer = Filer::new("wal", Arc::new(MemVfs::new()));
/// let info = SegmentInfo::new(1, 1).with_size_limit(4096);
///
/// let mut writer = filer.create(&info).unwrap();
/// writer.append(b"first").unwrap();
/// writer.seal().unwrap();
///
/// let reader = filer.open(&info).unwrap();
/// assert_eq!(reader.get(0).unwrap(), b"first");
/// ```
pub struct Filer {
    dir: PathBuf,
    vfs: Arc<dyn Vfs>,
    pool: Arc<BufferPool>,
    config: SegmentConfig,
}

impl Filer {
    /// Creates a filer over `dir` with the default configuration.
    pub fn new(dir: impl Into<PathBuf>, vfs: Arc<dyn Vfs>) -> Self {
        Self::with_config(dir, vfs, SegmentConfig::default())
    }

    /// Creates a filer over `dir` with a custom configuration.
    pub fn with_config(dir: impl Into<PathBuf>, vfs: Arc<dyn Vfs>, config: SegmentConfig) -> Self {
        let pool = Arc::new(BufferPool::new(
            config.min_buffer_size,
            config.max_idle_buffers,
        ));
        Self {
            dir: dir.into(),
            vfs,
            pool,
            config,
        }
    }

    /// Creates a new segment file and returns its writer.
    ///
    /// The file is preallocated to `info.size_limit` and its header is
    /// durable when this returns.
    ///
    /// # Errors
    ///
    /// - [`SegmentError::InvalidArgument`] if `info.base_index` is 0
    /// - a storage `AlreadyExists` error if the segment file exists
    /// - storage errors from creating or syncing the file
    pub fn create(&self, info: &SegmentInfo) -> SegmentResult<SegmentWriter> {
        if info.base_index == 0 {
            return Err(SegmentError::invalid_argument(
                "segment base index must be at least 1",
            ));
        }

        let name = file_name(info);
        let file = self
            .vfs
            .create(&self.dir, &name, u64::from(info.size_limit))?;
        SegmentWriter::create(
            *info,
            name,
            file,
            Arc::clone(&self.pool),
            self.config.sync_on_append,
        )
    }

    /// Reopens the unsealed tail segment for appending after a restart.
    ///
    /// Any partially written frame at the end is discarded.
    ///
    /// # Errors
    ///
    /// - [`SegmentError::SegmentNotFound`] if the file does not exist
    /// - [`SegmentError::HeaderMismatch`] if the file holds another segment
    /// - corruption errors for an unreadable header
    pub fn recover_tail(&self, info: &SegmentInfo) -> SegmentResult<SegmentWriter> {
        let name = file_name(info);
        let file = self
            .vfs
            .open_writer(&self.dir, &name)
            .map_err(|e| SegmentError::from_open(e, &name))?;
        SegmentWriter::recover(
            *info,
            name,
            file,
            Arc::clone(&self.pool),
            self.config.sync_on_append,
        )
    }

    /// Opens a sealed segment for reading.
    ///
    /// # Errors
    ///
    /// - [`SegmentError::SegmentNotFound`] if the file does not exist
    /// - [`SegmentError::Corruption`] if the header is truncated or the
    ///   frames do not tile the file
    /// - [`SegmentError::HeaderMismatch`] if the file holds another segment
    pub fn open(&self, info: &SegmentInfo) -> SegmentResult<SegmentReader> {
        let name = file_name(info);
        let file = self
            .vfs
            .open_reader(&self.dir, &name)
            .map_err(|e| SegmentError::from_open(e, &name))?;
        SegmentReader::open(
            *info,
            name,
            file,
            Arc::clone(&self.pool),
            self.config.verify_on_open,
        )
    }

    /// Reads the header of a segment file without checking its identity.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open), minus the identity check.
    pub fn read_info(&self, base_index: u64, id: u64) -> SegmentResult<SegmentInfo> {
        let name = segment_file_name(base_index, id);
        let file = self
            .vfs
            .open_reader(&self.dir, &name)
            .map_err(|e| SegmentError::from_open(e, &name))?;
        read_header(&*file)
    }

    /// Lists the segments in the directory as `id -> base_index`.
    ///
    /// Files without the `.wal` suffix are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::Corruption`] if a `.wal` file has a malformed
    /// name or two files share an id.
    pub fn list(&self) -> SegmentResult<BTreeMap<u64, u64>> {
        let mut segments = BTreeMap::new();
        for name in self.vfs.list_dir(&self.dir)? {
            if !name.ends_with(SEGMENT_FILE_SUFFIX) {
                continue;
            }
            let Some((base_index, id)) = parse_file_name(&name) else {
                warn!(dir = %self.dir.display(), file = %name, "malformed segment file name");
                return Err(SegmentError::corruption(format!(
                    "malformed segment file name: {name}"
                )));
            };
            if let Some(other) = segments.insert(id, base_index) {
                warn!(dir = %self.dir.display(), id, "duplicate segment id");
                return Err(SegmentError::corruption(format!(
                    "segment id {id:x} used by base indexes {other} and {base_index}"
                )));
            }
        }
        debug!(dir = %self.dir.display(), segments = segments.len(), "listed segments");
        Ok(segments)
    }

    /// Deletes a segment file. Deleting a missing segment succeeds.
    ///
    /// # Errors
    ///
    /// Returns storage errors other than not-found.
    pub fn delete(&self, base_index: u64, id: u64) -> SegmentResult<()> {
        let name = segment_file_name(base_index, id);
        match self.vfs.delete(&self.dir, &name) {
            Ok(()) => {
                info!(segment = %name, "deleted segment");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(segment = %name, "segment already deleted");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the directory this filer manages.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the buffer pool shared by this filer's writers and readers.
    #[must_use]
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }
}

impl std::fmt::Debug for Filer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filer")
            .field("dir", &self.dir)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
