//! Shared segment loading for writers and readers.
//!
//! Creating, recovering and reading a segment all go through
//! [`load_segment`]. The [`OpenMode`] decides which validations apply:
//!
//! | mode         | header                         | frame scan                      |
//! |--------------|--------------------------------|---------------------------------|
//! | `Fresh`      | not read, written by the writer | none                            |
//! | `Recovering` | torn tolerated, else validated | stops at first bad frame        |
//! | `SealedRead` | must be complete and valid      | any bad frame is corruption     |

use crate::error::{SegmentError, SegmentResult};
use crate::segment::frame::{FrameHeader, FRAME_HEADER_LEN};
use crate::segment::header::{decode_header, is_uncommitted, validate_header, HEADER_LEN};
use crate::segment::pool::BufferPool;
use crate::types::SegmentInfo;
use segwal_storage::ReadableFile;

/// How a segment file is being opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Newly created file; the header has not been written yet.
    Fresh,
    /// Unsealed tail reopened after a restart, possibly after a crash.
    Recovering,
    /// Sealed, immutable segment opened for reading.
    SealedRead,
}

/// State recovered from a segment file.
#[derive(Debug)]
pub(crate) struct LoadedSegment {
    /// Whether a valid header is already on disk.
    pub header_committed: bool,
    /// Start offset of every intact frame, in order.
    pub offsets: Vec<u64>,
    /// Offset just past the last intact frame.
    pub tail: u64,
    /// File length at load time.
    pub file_len: u64,
    /// Whether the scan stopped on a partially written frame.
    pub torn: bool,
}

/// Reads and decodes the header of a file that must have one.
///
/// A short read is corruption: a sealed segment can only exist once its
/// header was written, so a missing header means the file was damaged
/// after the fact.
pub(crate) fn read_header<F>(file: &F) -> SegmentResult<SegmentInfo>
where
    F: ReadableFile + ?Sized,
{
    let mut hdr = [0u8; HEADER_LEN];
    if let Err(e) = file.read_at(0, &mut hdr) {
        if e.is_eof() {
            return Err(SegmentError::corruption(format!(
                "failed to read header: {e}"
            )));
        }
        return Err(e.into());
    }
    decode_header(&hdr)
}

/// Loads a segment according to `mode`.
///
/// `verify` makes a sealed read check every frame checksum up front rather
/// than on each `get`. Recovery always checks checksums.
pub(crate) fn load_segment<F>(
    mode: OpenMode,
    info: &SegmentInfo,
    file: &F,
    pool: &BufferPool,
    verify: bool,
) -> SegmentResult<LoadedSegment>
where
    F: ReadableFile + ?Sized,
{
    let file_len = file.size()?;
    let body_start = HEADER_LEN as u64;

    match mode {
        OpenMode::Fresh => Ok(LoadedSegment {
            header_committed: false,
            offsets: Vec::new(),
            tail: body_start,
            file_len,
            torn: false,
        }),

        OpenMode::Recovering => {
            let mut hdr = [0u8; HEADER_LEN];
            let present = usize::try_from(file_len.min(body_start)).unwrap_or(HEADER_LEN);
            file.read_at(0, &mut hdr[..present])?;
            if is_uncommitted(&hdr[..present], info) {
                // Crashed before or while committing the header.
                return Ok(LoadedSegment {
                    header_committed: false,
                    offsets: Vec::new(),
                    tail: body_start,
                    file_len,
                    torn: false,
                });
            }
            if present < HEADER_LEN {
                return Err(SegmentError::corruption(format!(
                    "header truncated: {present} of {HEADER_LEN} bytes"
                )));
            }
            let got = decode_header(&hdr)?;
            validate_header(&got, info)?;

            let scan = scan_frames(file, pool, body_start, file_len, ScanPolicy::Tolerant)?;
            Ok(LoadedSegment {
                header_committed: true,
                offsets: scan.offsets,
                tail: scan.end,
                file_len,
                torn: scan.torn,
            })
        }

        OpenMode::SealedRead => {
            let got = read_header(file)?;
            validate_header(&got, info)?;

            let policy = if verify {
                ScanPolicy::StrictVerified
            } else {
                ScanPolicy::Strict
            };
            let scan = scan_frames(file, pool, body_start, file_len, policy)?;
            Ok(LoadedSegment {
                header_committed: true,
                offsets: scan.offsets,
                tail: scan.end,
                file_len,
                torn: false,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanPolicy {
    /// Stop at the first incomplete or invalid frame.
    Tolerant,
    /// Frames must tile the body exactly; payloads are not read.
    Strict,
    /// Like `Strict`, and every checksum is verified.
    StrictVerified,
}

struct Scan {
    offsets: Vec<u64>,
    end: u64,
    torn: bool,
}

fn scan_frames<F>(
    file: &F,
    pool: &BufferPool,
    start: u64,
    end: u64,
    policy: ScanPolicy,
) -> SegmentResult<Scan>
where
    F: ReadableFile + ?Sized,
{
    let tolerant = policy == ScanPolicy::Tolerant;
    let mut offsets = Vec::new();
    let mut offset = start;
    let mut torn = false;
    let mut buf = pool.checkout();

    while offset < end {
        let remaining = end - offset;
        if remaining < FRAME_HEADER_LEN as u64 {
            if tolerant {
                torn = true;
                break;
            }
            return Err(SegmentError::corruption(format!(
                "partial frame header at offset {offset}: {remaining} bytes left"
            )));
        }

        let mut hdr = [0u8; FRAME_HEADER_LEN];
        file.read_at(offset, &mut hdr)?;
        let header = FrameHeader::decode(&hdr);
        let blank = header.len == 0 && header.checksum == 0;

        if blank && !tolerant {
            return Err(SegmentError::corruption(format!(
                "unwritten space at offset {offset} in sealed segment"
            )));
        }

        if header.frame_len() > remaining {
            if tolerant {
                torn = !blank;
                break;
            }
            return Err(SegmentError::corruption(format!(
                "frame at offset {offset} claims {} bytes, only {remaining} left",
                header.frame_len()
            )));
        }

        if policy != ScanPolicy::Strict {
            buf.clear();
            buf.resize(header.len as usize, 0);
            file.read_at(offset + FRAME_HEADER_LEN as u64, &mut buf)?;
            let actual = header.compute_checksum(&buf);
            if actual != header.checksum {
                if tolerant {
                    torn = !blank;
                    break;
                }
                return Err(SegmentError::ChecksumMismatch {
                    position: offsets.len() as u64,
                    expected: header.checksum,
                    actual,
                });
            }
        }

        offsets.push(offset);
        offset += header.frame_len();
    }

    Ok(Scan {
        offsets,
        end: offset,
        torn,
    })
}

/// Reads the frame occupying `start..end` and copies its payload into `out`.
///
/// The frame bounds come from the in-memory offset index, so the whole frame
/// is fetched with a single read into a pooled buffer.
pub(crate) fn read_frame<F>(
    file: &F,
    pool: &BufferPool,
    position: u64,
    start: u64,
    end: u64,
    out: &mut Vec<u8>,
) -> SegmentResult<()>
where
    F: ReadableFile + ?Sized,
{
    let frame_len = usize::try_from(end - start)
        .map_err(|_| SegmentError::corruption(format!("frame {position} too large to read")))?;

    let mut buf = pool.checkout();
    buf.resize(frame_len, 0);
    file.read_at(start, &mut buf)?;

    let mut hdr = [0u8; FRAME_HEADER_LEN];
    hdr.copy_from_slice(&buf[..FRAME_HEADER_LEN]);
    let header = FrameHeader::decode(&hdr);
    if header.frame_len() != frame_len as u64 {
        return Err(SegmentError::corruption(format!(
            "frame {position} length changed: indexed {frame_len} bytes, header says {}",
            header.frame_len()
        )));
    }

    let payload = &buf[FRAME_HEADER_LEN..];
    let actual = header.compute_checksum(payload);
    if actual != header.checksum {
        return Err(SegmentError::ChecksumMismatch {
            position,
            expected: header.checksum,
            actual,
        });
    }

    out.clear();
    out.extend_from_slice(payload);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::frame::{encode_frame, encoded_len};
    use crate::segment::header::encode_header;
    use segwal_storage::{MemVfs, Vfs, WritableFile};
    use std::path::Path;

    fn pool() -> BufferPool {
        BufferPool::new(64, 2)
    }

    fn info() -> SegmentInfo {
        SegmentInfo::new(1, 1)
    }

    /// Builds a segment image: header followed by the given payload frames.
    fn image(payloads: &[&[u8]]) -> Vec<u8> {
        let mut bytes = encode_header(&info()).to_vec();
        for p in payloads {
            encode_frame(p, &mut bytes).unwrap();
        }
        bytes
    }

    fn file_with(bytes: Vec<u8>) -> Box<dyn WritableFile> {
        let vfs = MemVfs::new();
        let dir = Path::new("d");
        vfs.set_file_data(dir, "f", bytes);
        vfs.open_writer(dir, "f").unwrap()
    }

    #[test]
    fn fresh_reads_nothing() {
        let file = file_with(vec![0xFF; 100]);
        let loaded = load_segment(OpenMode::Fresh, &info(), &*file, &pool(), false).unwrap();
        assert!(!loaded.header_committed);
        assert!(loaded.offsets.is_empty());
        assert_eq!(loaded.tail, HEADER_LEN as u64);
    }

    #[test]
    fn sealed_read_indexes_all_frames() {
        let file = file_with(image(&[b"a", b"bb", b"ccc"]));
        let loaded = load_segment(OpenMode::SealedRead, &info(), &*file, &pool(), true).unwrap();

        let h = HEADER_LEN as u64;
        assert_eq!(
            loaded.offsets,
            vec![
                h,
                h + encoded_len(1) as u64,
                h + (encoded_len(1) + encoded_len(2)) as u64
            ]
        );
        assert_eq!(loaded.tail, loaded.file_len);
    }

    #[test]
    fn sealed_read_rejects_trailing_bytes() {
        let mut bytes = image(&[b"abc"]);
        bytes.extend_from_slice(&[1, 2, 3]);
        let file = file_with(bytes);
        let err = load_segment(OpenMode::SealedRead, &info(), &*file, &pool(), false).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn sealed_read_rejects_zeroed_tail() {
        let mut bytes = image(&[b"abc"]);
        bytes.extend_from_slice(&[0u8; 64]);
        let file = file_with(bytes);
        let err = load_segment(OpenMode::SealedRead, &info(), &*file, &pool(), false).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn sealed_read_short_header_is_corruption() {
        let file = file_with(image(&[])[..10].to_vec());
        let err = load_segment(OpenMode::SealedRead, &info(), &*file, &pool(), false).unwrap_err();
        assert!(matches!(err, SegmentError::Corruption { .. }));
    }

    #[test]
    fn sealed_read_lazy_tolerates_bad_checksum_until_verified() {
        let mut bytes = image(&[b"abc", b"def"]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        let file = file_with(bytes);
        let loaded = load_segment(OpenMode::SealedRead, &info(), &*file, &pool(), false).unwrap();
        assert_eq!(loaded.offsets.len(), 2);

        let err = load_segment(OpenMode::SealedRead, &info(), &*file, &pool(), true).unwrap_err();
        assert!(matches!(err, SegmentError::ChecksumMismatch { position: 1, .. }));
    }

    #[test]
    fn recovery_stops_at_torn_frame() {
        let full = image(&[b"one", b"two", b"three"]);
        let cut = full.len() - 2;
        let file = file_with(full[..cut].to_vec());

        let loaded = load_segment(OpenMode::Recovering, &info(), &*file, &pool(), false).unwrap();
        assert_eq!(loaded.offsets.len(), 2);
        assert_eq!(
            loaded.tail,
            (HEADER_LEN + encoded_len(3) + encoded_len(3)) as u64
        );
        assert!(loaded.torn);
    }

    #[test]
    fn recovery_stops_at_preallocated_zeros() {
        let mut bytes = image(&[b"one"]);
        bytes.resize(4096, 0);
        let file = file_with(bytes);

        let loaded = load_segment(OpenMode::Recovering, &info(), &*file, &pool(), false).unwrap();
        assert_eq!(loaded.offsets.len(), 1);
        assert_eq!(loaded.tail, (HEADER_LEN + encoded_len(3)) as u64);
        assert!(!loaded.torn);
    }

    #[test]
    fn recovery_stops_at_bad_checksum() {
        let mut bytes = image(&[b"one", b"two"]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        bytes.resize(1024, 0);
        let file = file_with(bytes);

        let loaded = load_segment(OpenMode::Recovering, &info(), &*file, &pool(), false).unwrap();
        assert_eq!(loaded.offsets.len(), 1);
        assert!(loaded.torn);
    }

    #[test]
    fn recovery_tolerates_blank_or_short_header() {
        for bytes in [vec![0u8; 4096], vec![0u8; 5], Vec::new()] {
            let file = file_with(bytes);
            let loaded =
                load_segment(OpenMode::Recovering, &info(), &*file, &pool(), false).unwrap();
            assert!(!loaded.header_committed);
            assert_eq!(loaded.tail, HEADER_LEN as u64);
        }
    }

    #[test]
    fn recovery_treats_torn_header_alike_with_or_without_preallocation() {
        let header = encode_header(&info());
        let mut preallocated = header[..12].to_vec();
        preallocated.resize(4096, 0);

        for bytes in [header[..12].to_vec(), preallocated] {
            let file = file_with(bytes);
            let loaded =
                load_segment(OpenMode::Recovering, &info(), &*file, &pool(), false).unwrap();
            assert!(!loaded.header_committed);
            assert!(loaded.offsets.is_empty());
            assert_eq!(loaded.tail, HEADER_LEN as u64);
        }
    }

    #[test]
    fn recovery_short_foreign_header_is_corruption() {
        let file = file_with(vec![0xAB; 10]);
        let err = load_segment(OpenMode::Recovering, &info(), &*file, &pool(), false).unwrap_err();
        assert!(matches!(err, SegmentError::Corruption { .. }));
    }

    #[test]
    fn recovery_validates_present_header() {
        let file = file_with(image(&[b"x"]));
        let other = SegmentInfo::new(1, 2);
        let err = load_segment(OpenMode::Recovering, &other, &*file, &pool(), false).unwrap_err();
        assert!(matches!(err, SegmentError::HeaderMismatch { field: "id", .. }));
    }

    #[test]
    fn read_frame_returns_payload() {
        let file = file_with(image(&[b"hello", b"world"]));
        let start = (HEADER_LEN + encoded_len(5)) as u64;
        let end = start + encoded_len(5) as u64;

        let mut out = vec![0xEE; 3];
        read_frame(&*file, &pool(), 1, start, end, &mut out).unwrap();
        assert_eq!(out, b"world");
    }
}
