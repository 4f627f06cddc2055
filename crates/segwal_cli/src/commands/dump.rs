//! Dump command implementation.

use super::{hex_preview, open_sealed};
use segwal_core::Filer;
use serde::Serialize;

const PREVIEW_BYTES: usize = 16;

/// Record representation for output.
#[derive(Debug, Serialize)]
pub struct RecordInfo {
    /// Position within the segment.
    pub position: u64,
    /// Logical log index.
    pub index: u64,
    /// Payload size in bytes (if readable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub len: Option<usize>,
    /// Hex-encoded payload prefix (if readable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    /// Read error (if the record is damaged).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs the dump command.
pub fn run(
    filer: &Filer,
    base_index: u64,
    id: u64,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = read_records(filer, base_index, id, limit)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            print_text_output(&records);
        }
    }

    Ok(())
}

fn read_records(
    filer: &Filer,
    base_index: u64,
    id: u64,
    limit: Option<usize>,
) -> Result<Vec<RecordInfo>, Box<dyn std::error::Error>> {
    let reader = open_sealed(filer, base_index, id)?;
    let max_records = limit.unwrap_or(usize::MAX);

    let records = reader
        .iter()
        .take(max_records)
        .enumerate()
        .map(|(i, result)| {
            let position = i as u64;
            let mut record = RecordInfo {
                position,
                index: base_index + position,
                len: None,
                preview: None,
                error: None,
            };
            match result {
                Ok((_, payload)) => {
                    record.len = Some(payload.len());
                    record.preview = Some(hex_preview(&payload, PREVIEW_BYTES));
                }
                Err(e) => record.error = Some(e.to_string()),
            }
            record
        })
        .collect();
    Ok(records)
}

fn print_text_output(records: &[RecordInfo]) {
    println!("Segment Records ({} total)", records.len());
    println!("================");
    println!();

    for record in records {
        print!("[{:06}] index={}", record.position, record.index);
        if let Some(len) = record.len {
            print!(" len={len}");
        }
        if let Some(ref preview) = record.preview {
            print!(" {preview}");
        }
        if let Some(ref error) = record.error {
            print!(" ERROR: {error}");
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segwal_core::SegmentInfo;
    use segwal_storage::MemVfs;
    use std::sync::Arc;

    #[test]
    fn dump_respects_limit() {
        let filer = Filer::new("wal", Arc::new(MemVfs::new()));
        let mut writer = filer.create(&SegmentInfo::new(7, 1)).unwrap();
        writer
            .append_batch([&b"\x00\x01"[..], b"second", b"third"])
            .unwrap();
        writer.seal().unwrap();

        let records = read_records(&filer, 7, 1, Some(2)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].index, 7);
        assert_eq!(records[0].preview.as_deref(), Some("0001"));
        assert_eq!(records[1].index, 8);
        assert_eq!(records[1].len, Some(6));

        let json = serde_json::to_value(&records).unwrap();
        assert_eq!(json[1]["position"], 1);
        assert!(json[0].get("error").is_none());
    }
}
