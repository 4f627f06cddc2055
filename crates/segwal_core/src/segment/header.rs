//! Segment file header codec.

use crate::error::{SegmentError, SegmentResult};
use crate::types::SegmentInfo;
use bytes::{Buf, BufMut};

/// Magic number identifying a segment file.
pub const SEGMENT_MAGIC: u32 = 0x58EB_6B0D;

/// Current segment format version.
pub const SEGMENT_VERSION: u8 = 1;

/// Size of the segment header in bytes.
///
/// magic (4) + reserved (3) + version (1) + base_index (8) + id (8) + codec (8) = 32 bytes
pub const HEADER_LEN: usize = 32;

/// Encodes the header for `info`.
#[must_use]
pub fn encode_header(info: &SegmentInfo) -> [u8; HEADER_LEN] {
    let mut buf = [0u8; HEADER_LEN];
    let mut cursor = &mut buf[..];
    cursor.put_u32_le(SEGMENT_MAGIC);
    cursor.put_bytes(0, 3); // reserved
    cursor.put_u8(SEGMENT_VERSION);
    cursor.put_u64_le(info.base_index);
    cursor.put_u64_le(info.id);
    cursor.put_u64_le(info.codec);
    buf
}

/// Decodes a header.
///
/// The returned info has `size_limit` 0, since the limit is not stored.
///
/// # Errors
///
/// Returns [`SegmentError::Corruption`] if `bytes` is shorter than a header
/// or the magic is wrong, and [`SegmentError::UnsupportedVersion`] for an
/// unknown version.
pub fn decode_header(bytes: &[u8]) -> SegmentResult<SegmentInfo> {
    if bytes.len() < HEADER_LEN {
        return Err(SegmentError::corruption(format!(
            "header truncated: {} of {HEADER_LEN} bytes",
            bytes.len()
        )));
    }

    let mut buf = &bytes[..HEADER_LEN];
    let magic = buf.get_u32_le();
    if magic != SEGMENT_MAGIC {
        return Err(SegmentError::corruption(format!(
            "invalid magic {magic:08x}, expected {SEGMENT_MAGIC:08x}"
        )));
    }
    buf.advance(3);
    let version = buf.get_u8();
    if version != SEGMENT_VERSION {
        return Err(SegmentError::UnsupportedVersion { version });
    }

    let base_index = buf.get_u64_le();
    let id = buf.get_u64_le();
    let codec = buf.get_u64_le();

    Ok(SegmentInfo::new(base_index, id).with_codec(codec))
}

/// Checks that a decoded header describes the segment the caller expected.
///
/// A file whose name parses correctly can still hold another segment's
/// content (a misplaced or copied file); this catches it.
///
/// # Errors
///
/// Returns [`SegmentError::HeaderMismatch`] naming the first differing field.
pub fn validate_header(got: &SegmentInfo, want: &SegmentInfo) -> SegmentResult<()> {
    let fields = [
        ("base_index", want.base_index, got.base_index),
        ("id", want.id, got.id),
        ("codec", want.codec, got.codec),
    ];
    for (field, expected, actual) in fields {
        if expected != actual {
            return Err(SegmentError::HeaderMismatch {
                field,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

/// Returns true if `bytes` can only be an unfinished write of `want`'s header.
///
/// Created files are zero filled, so a crash before or during the header
/// write leaves bytes that are each either zero or the expected byte,
/// whether or not the file was preallocated. A complete header does not
/// count.
pub(crate) fn is_uncommitted(bytes: &[u8], want: &SegmentInfo) -> bool {
    let expected = encode_header(want);
    bytes.len() <= HEADER_LEN
        && bytes != &expected[..]
        && bytes.iter().zip(expected).all(|(&b, e)| b == 0 || b == e)
}
