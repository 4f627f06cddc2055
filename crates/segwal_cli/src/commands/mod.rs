//! CLI command implementations.

pub mod dump;
pub mod inspect;
pub mod list;
pub mod verify;

use segwal_core::{Filer, SegmentReader, SegmentResult};

/// Returns the segments of the directory as `(base_index, id)` in log order.
pub fn sorted_segments(filer: &Filer) -> SegmentResult<Vec<(u64, u64)>> {
    let mut segments: Vec<_> = filer
        .list()?
        .into_iter()
        .map(|(id, base_index)| (base_index, id))
        .collect();
    segments.sort_unstable();
    Ok(segments)
}

/// Opens a sealed segment whose codec is not known up front.
pub fn open_sealed(filer: &Filer, base_index: u64, id: u64) -> SegmentResult<SegmentReader> {
    let info = filer.read_info(base_index, id)?;
    filer.open(&info)
}

/// Hex-encodes at most `max` bytes, marking truncation with `..`.
pub fn hex_preview(bytes: &[u8], max: usize) -> String {
    let mut out: String = bytes
        .iter()
        .take(max)
        .map(|b| format!("{b:02x}"))
        .collect();
    if bytes.len() > max {
        out.push_str("..");
    }
    out
}
