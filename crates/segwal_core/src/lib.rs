//! # segwal Core
//!
//! Segment-file storage engine for a consensus write-ahead log.
//!
//! This crate provides:
//! - The segment file format (header and checksummed record frames)
//! - [`SegmentWriter`] for appending to, recovering and sealing the tail
//!   segment
//! - [`SegmentReader`] for random access into sealed segments
//! - [`Filer`] for naming, creating, listing and deleting segment files
//! - [`BufferPool`] for reusing encode/decode buffers
//!
//! All file access goes through the [`segwal_storage::Vfs`] trait, so the
//! engine runs the same over real files and in memory.
//!
//! ## Example
//!
//! ```rust
//! use segwal_core::{Filer, SegmentInfo};
//! use segwal_storage::MemVfs;
//! use std::sync::Arc;
//!
//! let filer = Filer::new("wal", Arc::new(MemVfs::new()));
//! let info = SegmentInfo::new(1, 1).with_size_limit(64 * 1024);
//!
//! let mut tail = filer.create(&info).unwrap();
//! tail.append(b"entry 1").unwrap();
//! tail.append(b"entry 2").unwrap();
//! tail.flush().unwrap();
//! drop(tail);
//!
//! // After a restart:
//! let mut tail = filer.recover_tail(&info).unwrap();
//! assert_eq!(tail.len(), 2);
//! tail.seal().unwrap();
//!
//! let reader = filer.open(&info).unwrap();
//! assert_eq!(reader.get(1).unwrap(), b"entry 2");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod filer;
mod segment;
mod types;

pub use config::{SegmentConfig, DEFAULT_MIN_BUFFER_SIZE};
pub use error::{ErrorKind, SegmentError, SegmentResult};
pub use filer::{file_name, parse_file_name, segment_file_name, Filer, SEGMENT_FILE_SUFFIX};
pub use segment::{
    decode_header, encode_frame, encode_header, encoded_len, frame_checksum, validate_header,
    BufferPool, FrameHeader, OpenMode, PoolStats, PooledBuffer, Records, SegmentReader,
    SegmentWriter, WriterState, FRAME_HEADER_LEN, HEADER_LEN, MAX_PAYLOAD_LEN,
    MAX_RETAINED_FACTOR, SEGMENT_MAGIC, SEGMENT_VERSION,
};
pub use types::SegmentInfo;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
