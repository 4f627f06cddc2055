//! Inspect command implementation.

use segwal_core::{segment_file_name, Filer, SegmentResult, SEGMENT_VERSION};
use serde::Serialize;

/// Segment inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// File name.
    pub file: String,
    /// Format version.
    pub version: u8,
    /// Logical index of the first record.
    pub base_index: u64,
    /// Segment id.
    pub id: u64,
    /// Payload codec.
    pub codec: u64,
    /// Whether the segment opened as a sealed segment.
    pub sealed: bool,
    /// Number of records (sealed segments only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<u64>,
    /// Index of the last record (sealed, non-empty segments only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_index: Option<u64>,
    /// Segment size in bytes (sealed segments only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Why the segment could not be opened as sealed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_error: Option<String>,
}

/// Runs the inspect command.
pub fn run(
    filer: &Filer,
    base_index: u64,
    id: u64,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(filer, base_index, id)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn inspect(filer: &Filer, base_index: u64, id: u64) -> SegmentResult<InspectResult> {
    let info = filer.read_info(base_index, id)?;
    let mut result = InspectResult {
        file: segment_file_name(base_index, id),
        version: SEGMENT_VERSION,
        base_index: info.base_index,
        id: info.id,
        codec: info.codec,
        sealed: false,
        records: None,
        last_index: None,
        size: None,
        open_error: None,
    };

    // An unsealed tail still has preallocated space and will not open.
    match filer.open(&info) {
        Ok(reader) => {
            result.sealed = true;
            result.records = Some(reader.len());
            result.last_index = reader.last_index();
            result.size = Some(reader.size_bytes());
        }
        Err(e) => result.open_error = Some(e.to_string()),
    }

    Ok(result)
}

fn print_text_output(result: &InspectResult) {
    println!("Segment {}", result.file);
    println!("================");
    println!();
    println!("Header:");
    println!("  Version:    {}", result.version);
    println!("  Base index: {}", result.base_index);
    println!("  Id:         {:016x}", result.id);
    println!("  Codec:      {}", result.codec);
    println!();

    if result.sealed {
        println!("Records:");
        println!("  Count:      {}", result.records.unwrap_or(0));
        match result.last_index {
            Some(last) => println!("  Indexes:    {}..={}", result.base_index, last),
            None => println!("  Indexes:    (empty)"),
        }
        println!("  Size:       {} bytes", result.size.unwrap_or(0));
    } else if let Some(ref error) = result.open_error {
        println!("Not readable as a sealed segment: {error}");
    }
}
