//! Verify command implementation.

use super::{open_sealed, sorted_segments};
use segwal_core::{segment_file_name, Filer};
use tracing::warn;

/// Verification result for one segment.
#[derive(Debug)]
pub struct VerifyResult {
    /// Segment file name.
    pub file: String,
    /// Number of records checked.
    pub records_checked: u64,
    /// Number of corrupt records.
    pub corrupt_records: u64,
    /// List of errors found.
    pub errors: Vec<String>,
}

impl VerifyResult {
    fn new(file: String) -> Self {
        Self {
            file,
            records_checked: 0,
            corrupt_records: 0,
            errors: Vec::new(),
        }
    }

    fn is_ok(&self) -> bool {
        self.corrupt_records == 0 && self.errors.is_empty()
    }
}

/// Runs the verify command.
pub fn run(filer: &Filer, skip_tail: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying segments in {}", filer.dir().display());
    println!();

    let results = verify_all(filer, skip_tail)?;
    for result in &results {
        print_result(result);
    }

    println!();
    if results.iter().all(VerifyResult::is_ok) {
        println!("✓ Verification passed ({} segments)", results.len());
        Ok(())
    } else {
        println!("✗ Verification failed");
        Err("Verification failed".into())
    }
}

fn verify_all(filer: &Filer, skip_tail: bool) -> Result<Vec<VerifyResult>, Box<dyn std::error::Error>> {
    let mut segments = sorted_segments(filer)?;
    if skip_tail {
        segments.pop();
    }

    Ok(segments
        .into_iter()
        .map(|(base_index, id)| verify_segment(filer, base_index, id))
        .collect())
}

fn verify_segment(filer: &Filer, base_index: u64, id: u64) -> VerifyResult {
    let mut result = VerifyResult::new(segment_file_name(base_index, id));

    let reader = match open_sealed(filer, base_index, id) {
        Ok(reader) => reader,
        Err(e) => {
            warn!(segment = %result.file, error = %e, "segment failed to open");
            result.errors.push(e.to_string());
            return result;
        }
    };

    let mut buf = Vec::new();
    for position in 0..reader.len() {
        result.records_checked += 1;
        if let Err(e) = reader.get_into(position, &mut buf) {
            result.corrupt_records += 1;
            result.errors.push(format!(
                "record {} (index {}): {e}",
                position,
                base_index + position
            ));
        }
    }
    result
}

fn print_result(result: &VerifyResult) {
    println!(
        "  {} records checked: {}, corrupt: {}",
        result.file, result.records_checked, result.corrupt_records
    );
    for error in &result.errors {
        println!("    ERROR: {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segwal_core::{SegmentInfo, HEADER_LEN};
    use segwal_storage::MemVfs;
    use std::sync::Arc;

    fn sealed(filer: &Filer, base: u64, id: u64, payloads: &[&[u8]]) {
        let mut writer = filer.create(&SegmentInfo::new(base, id)).unwrap();
        for p in payloads {
            writer.append(p).unwrap();
        }
        writer.seal().unwrap();
    }

    #[test]
    fn clean_directory_passes() {
        let filer = Filer::new("wal", Arc::new(MemVfs::new()));
        sealed(&filer, 1, 1, &[b"a", b"b"]);
        sealed(&filer, 3, 2, &[b"c"]);

        let results = verify_all(&filer, false).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(VerifyResult::is_ok));
        assert_eq!(results[0].records_checked, 2);
    }

    #[test]
    fn damaged_record_is_reported() {
        let vfs = MemVfs::new();
        let filer = Filer::new("wal", Arc::new(vfs.clone()));
        sealed(&filer, 1, 1, &[b"good", b"damaged"]);

        let name = segment_file_name(1, 1);
        let mut data = vfs.file_data(filer.dir(), &name).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xFF;
        vfs.set_file_data(filer.dir(), &name, data);

        let results = verify_all(&filer, false).unwrap();
        assert_eq!(results[0].records_checked, 2);
        assert_eq!(results[0].corrupt_records, 1);
        assert!(!results[0].is_ok());
    }

    #[test]
    fn skip_tail_ignores_unsealed_segment() {
        let filer = Filer::new("wal", Arc::new(MemVfs::new()));
        sealed(&filer, 1, 1, &[b"a"]);
        let info = SegmentInfo::new(2, 2).with_size_limit(1024);
        filer.create(&info).unwrap().append(b"open").unwrap();

        let results = verify_all(&filer, false).unwrap();
        assert!(!results[1].is_ok());

        let results = verify_all(&filer, true).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());
    }

    #[test]
    fn truncated_header_fails_open() {
        let vfs = MemVfs::new();
        let filer = Filer::new("wal", Arc::new(vfs.clone()));
        sealed(&filer, 1, 1, &[b"a"]);
        vfs.truncate_file(filer.dir(), &segment_file_name(1, 1), HEADER_LEN as u64 - 1)
            .unwrap();

        let results = verify_all(&filer, false).unwrap();
        assert_eq!(results[0].records_checked, 0);
        assert_eq!(results[0].errors.len(), 1);
    }
}
