//! List command implementation.

use super::sorted_segments;
use segwal_core::{segment_file_name, Filer};
use serde::Serialize;

/// One segment of the directory.
#[derive(Debug, Serialize)]
pub struct SegmentEntry {
    /// Logical index of the first record.
    pub base_index: u64,
    /// Segment id.
    pub id: u64,
    /// File name.
    pub file: String,
    /// Codec recorded in the header, if the header is readable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<u64>,
    /// Why the header could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs the list command.
pub fn run(filer: &Filer, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let entries = collect(filer)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => {
            print_text_output(filer, &entries);
        }
    }

    Ok(())
}

fn collect(filer: &Filer) -> Result<Vec<SegmentEntry>, Box<dyn std::error::Error>> {
    let entries = sorted_segments(filer)?
        .into_iter()
        .map(|(base_index, id)| {
            let (codec, error) = match filer.read_info(base_index, id) {
                Ok(info) => (Some(info.codec), None),
                Err(e) => (None, Some(e.to_string())),
            };
            SegmentEntry {
                base_index,
                id,
                file: segment_file_name(base_index, id),
                codec,
                error,
            }
        })
        .collect();
    Ok(entries)
}

fn print_text_output(filer: &Filer, entries: &[SegmentEntry]) {
    println!("Segments in {} ({} total)", filer.dir().display(), entries.len());
    println!("================");
    println!();

    for entry in entries {
        print!("{:>20} {:016x}", entry.base_index, entry.id);
        if let Some(codec) = entry.codec {
            print!(" codec={codec}");
        }
        if let Some(ref error) = entry.error {
            print!(" ERROR: {error}");
        }
        println!();
    }
}
