//! Segment files.
//!
//! A segment is one file of the log: a fixed header followed by a run of
//! record frames. The tail segment is appended to through a
//! [`SegmentWriter`]; once sealed it is immutable and read through a
//! [`SegmentReader`].
//!
//! ## Segment File Format
//!
//! ```text
//! | magic (4) | reserved (3) | version (1) | base_index (8) | id (8) | codec (8) |
//! | len (4) | checksum (4) | payload (len) |
//! | len (4) | checksum (4) | payload (len) |
//! ...
//! ```
//!
//! All integers are little-endian. The first record has logical index
//! `base_index`; record `k` has index `base_index + k`.
//!
//! Files are preallocated with zeros. Unsealed segments may carry zeroed
//! space after the last frame; sealed segments end exactly at their last
//! frame.

mod frame;
mod header;
mod load;
mod pool;
mod reader;
mod writer;

pub use frame::{
    encode_frame, encoded_len, frame_checksum, FrameHeader, FRAME_HEADER_LEN, MAX_PAYLOAD_LEN,
};
pub use header::{
    decode_header, encode_header, validate_header, HEADER_LEN, SEGMENT_MAGIC, SEGMENT_VERSION,
};
pub use load::OpenMode;
pub use pool::{BufferPool, PoolStats, PooledBuffer, MAX_RETAINED_FACTOR};
pub use reader::{Records, SegmentReader};
pub use writer::{SegmentWriter, WriterState};

pub(crate) use load::read_header;
