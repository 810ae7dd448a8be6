//! Inspect command implementation.

use ringlog_storage::{FileBackend, RecordBuffer, StorageBackend, WriteAccumulator};
use serde::Serialize;
use std::path::Path;

/// Data file inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Data file path.
    pub path: String,
    /// File size in bytes.
    pub file_size: u64,
    /// Capacity used for the replay.
    pub capacity: usize,
    /// Complete records found in the file.
    pub records_in_file: usize,
    /// Bytes after the last delimiter.
    pub trailing_bytes: usize,
    /// Records that would be resident after a restart.
    pub resident: Vec<RecordEntry>,
}

/// One resident record.
#[derive(Debug, Serialize)]
pub struct RecordEntry {
    /// Offset of the first byte in the logical stream.
    pub offset: u64,
    /// Length including the delimiter.
    pub len: usize,
    /// Contents, lossily decoded.
    pub text: String,
}

/// Runs the inspect command.
pub fn run(path: &Path, capacity: usize, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(path, capacity)?;

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

/// Replays a data file the way a starting store would, without writing it.
pub fn inspect(path: &Path, capacity: usize) -> Result<InspectResult, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No data file found at {:?}", path).into());
    }

    let backend = FileBackend::open(path)?;
    let image = backend.load()?;

    let mut replay = WriteAccumulator::default();
    let records = replay.drain_records(&image)?;
    let records_in_file = records.len();

    let mut ring = RecordBuffer::new(capacity)?;
    for record in records {
        ring.commit(record);
    }

    let mut offset = 0u64;
    let resident = ring
        .iter()
        .map(|record| {
            let entry = RecordEntry {
                offset,
                len: record.len(),
                text: String::from_utf8_lossy(record.as_bytes()).into_owned(),
            };
            offset += record.len() as u64;
            entry
        })
        .collect();

    Ok(InspectResult {
        path: path.display().to_string(),
        file_size: backend.size()?,
        capacity,
        records_in_file,
        trailing_bytes: replay.pending_len(),
        resident,
    })
}

fn print_text_output(result: &InspectResult) {
    println!("ringlog data file");
    println!("=================");
    println!();
    println!("Path:     {}", result.path);
    println!("Size:     {} bytes", result.file_size);
    println!("Capacity: {}", result.capacity);
    println!();
    println!("Records in file: {}", result.records_in_file);
    println!("Resident:        {}", result.resident.len());
    if result.trailing_bytes > 0 {
        println!("Trailing bytes:  {} (dropped on restart)", result.trailing_bytes);
    }

    if !result.resident.is_empty() {
        println!();
        for entry in &result.resident {
            println!("  [{:>8}] {}", entry.offset, entry.text.trim_end_matches('\n'));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspect_replays_with_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ringlogdata");
        std::fs::write(&path, b"a\nbb\nccc\ntail").unwrap();

        let result = inspect(&path, 2).unwrap();
        assert_eq!(result.file_size, 13);
        assert_eq!(result.records_in_file, 3);
        assert_eq!(result.trailing_bytes, 4);
        assert_eq!(result.resident.len(), 2);
        assert_eq!(result.resident[0].offset, 0);
        assert_eq!(result.resident[0].text, "bb\n");
        assert_eq!(result.resident[1].offset, 3);
        assert_eq!(result.resident[1].len, 4);

        // The file is left untouched.
        assert_eq!(std::fs::read(&path).unwrap(), b"a\nbb\nccc\ntail");
    }

    #[test]
    fn inspect_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(inspect(&dir.path().join("absent"), 10).is_err());
    }

    #[test]
    fn inspect_result_serializes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ringlogdata");
        std::fs::write(&path, b"x\n").unwrap();

        let json = serde_json::to_string(&inspect(&path, 10).unwrap()).unwrap();
        assert!(json.contains("\"records_in_file\":1"));
        assert!(json.contains("\"text\":\"x\\n\""));
    }
}
