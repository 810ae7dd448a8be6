//! Offset addressed reads over a record ring.

use crate::ring::RecordBuffer;

/// Returns the bytes a read of at most `max_len` bytes at `offset` yields.
///
/// The extent starts at `offset` and stops at the end of the record that
/// contains it, so one call never merges two records. Callers that want
/// the whole stream start at zero and advance by the returned length until
/// this returns `None`.
#[must_use]
pub fn read_extent(ring: &RecordBuffer, offset: u64, max_len: usize) -> Option<&[u8]> {
    let (record, intra) = ring.find_offset(offset)?;
    let bytes = &record.as_bytes()[intra..];
    Some(&bytes[..bytes.len().min(max_len)])
}
