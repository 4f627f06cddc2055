//! Record frame codec.
//!
//! ```text
//! | length (4) | checksum (4) | payload (length) |
//! ```
//!
//! The checksum is CRC-32 (IEEE) over the four little-endian length bytes
//! followed by the payload, so a damaged length is caught as well as a
//! damaged payload.

use crate::error::{SegmentError, SegmentResult};
use bytes::{Buf, BufMut};

/// Size of a frame header in bytes: length (4) + checksum (4).
pub const FRAME_HEADER_LEN: usize = 8;

/// Largest payload a single frame can carry.
pub const MAX_PAYLOAD_LEN: usize = u32::MAX as usize;

/// The fixed-size prefix of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Payload length in bytes.
    pub len: u32,
    /// Stored checksum.
    pub checksum: u32,
}

impl FrameHeader {
    /// Decodes a frame header.
    #[must_use]
    pub fn decode(bytes: &[u8; FRAME_HEADER_LEN]) -> Self {
        let mut buf = &bytes[..];
        let len = buf.get_u32_le();
        let checksum = buf.get_u32_le();
        Self { len, checksum }
    }

    /// Returns the size of the whole frame, header included.
    #[must_use]
    pub fn frame_len(&self) -> u64 {
        FRAME_HEADER_LEN as u64 + u64::from(self.len)
    }

    /// Recomputes the checksum over `payload` with this header's length.
    #[must_use]
    pub fn compute_checksum(&self, payload: &[u8]) -> u32 {
        frame_checksum(self.len, payload)
    }

    /// Returns true if `payload` matches the stored checksum.
    #[must_use]
    pub fn verify(&self, payload: &[u8]) -> bool {
        payload.len() == self.len as usize && self.compute_checksum(payload) == self.checksum
    }
}

/// Computes the frame checksum for a payload of declared length `len`.
#[must_use]
pub fn frame_checksum(len: u32, payload: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&len.to_le_bytes());
    hasher.update(payload);
    hasher.finalize()
}

/// Returns the encoded size of a frame carrying `payload_len` bytes.
#[must_use]
pub const fn encoded_len(payload_len: usize) -> usize {
    FRAME_HEADER_LEN + payload_len
}

/// Appends the frame for `payload` to `buf`.
///
/// # Errors
///
/// Returns [`SegmentError::PayloadTooLarge`] if the payload length does not
/// fit in the 4-byte length field.
pub fn encode_frame(payload: &[u8], buf: &mut Vec<u8>) -> SegmentResult<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| SegmentError::PayloadTooLarge { len: payload.len() })?;

    buf.reserve(encoded_len(payload.len()));
    buf.put_u32_le(len);
    buf.put_u32_le(frame_checksum(len, payload));
    buf.put_slice(payload);
    Ok(())
}
