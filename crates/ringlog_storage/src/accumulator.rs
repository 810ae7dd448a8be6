//! Per-writer staging of partial records.

use crate::error::{StorageError, StorageResult};
use crate::record::{Record, DEFAULT_DELIMITER};

/// Assembles raw byte chunks into delimiter-terminated records.
///
/// A writer may deliver a record across any number of chunks. Bytes stay
/// pending until a delimiter arrives, at which point everything up to and
/// including the delimiter becomes one [`Record`].
///
/// Bytes that follow a delimiter inside the same chunk are kept as the
/// start of the next record. If they already contain another delimiter,
/// [`next_record`](Self::next_record) returns it without further input.
///
/// # Example
///
/// ```rust
/// use ringlog_storage::WriteAccumulator;
///
/// let mut acc = WriteAccumulator::new(b'\n');
/// assert!(acc.feed(b"hello").unwrap().is_none());
/// let record = acc.feed(b" world\n").unwrap().unwrap();
/// assert_eq!(record.as_bytes(), b"hello world\n");
/// assert!(!acc.has_pending());
/// ```
#[derive(Debug)]
pub struct WriteAccumulator {
    pending: Vec<u8>,
    /// Prefix of `pending` known to contain no delimiter.
    scanned: usize,
    delimiter: u8,
}

impl WriteAccumulator {
    /// Creates an empty accumulator splitting on `delimiter`.
    #[must_use]
    pub fn new(delimiter: u8) -> Self {
        Self {
            pending: Vec::new(),
            scanned: 0,
            delimiter,
        }
    }

    /// Appends `bytes` and returns the first record they complete.
    ///
    /// Empty input is a no-op and returns `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Allocation`] if the pending buffer cannot
    /// grow. The pending bytes are left exactly as they were.
    pub fn feed(&mut self, bytes: &[u8]) -> StorageResult<Option<Record>> {
        if bytes.is_empty() {
            return Ok(None);
        }
        self.pending
            .try_reserve(bytes.len())
            .map_err(|_| StorageError::Allocation {
                requested: bytes.len(),
            })?;
        self.pending.extend_from_slice(bytes);
        Ok(self.next_record())
    }

    /// Splits off the next complete record already sitting in the pending
    /// bytes, if any.
    pub fn next_record(&mut self) -> Option<Record> {
        let Some(pos) = self.pending[self.scanned..]
            .iter()
            .position(|&b| b == self.delimiter)
        else {
            self.scanned = self.pending.len();
            return None;
        };

        let end = self.scanned + pos + 1;
        let rest = self.pending.split_off(end);
        let bytes = std::mem::replace(&mut self.pending, rest);
        self.scanned = 0;
        Some(Record::from_nonempty(bytes))
    }

    /// Feeds `bytes` and collects every record completed, in order.
    ///
    /// # Errors
    ///
    /// Same as [`feed`](Self::feed).
    pub fn drain_records(&mut self, bytes: &[u8]) -> StorageResult<Vec<Record>> {
        let mut records = Vec::new();
        let mut next = self.feed(bytes)?;
        while let Some(record) = next {
            records.push(record);
            next = self.next_record();
        }
        Ok(records)
    }

    /// Number of bytes waiting for a delimiter.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if a partial record is waiting.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drops the partial record, returning how many bytes were discarded.
    pub fn discard(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending = Vec::new();
        self.scanned = 0;
        dropped
    }
}

impl Default for WriteAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bytes_of(records: Vec<Record>) -> Vec<Vec<u8>> {
        records.into_iter().map(Record::into_bytes).collect()
    }

    #[test]
    fn partial_then_complete() {
        let mut acc = WriteAccumulator::default();
        assert!(acc.feed(b"hello").unwrap().is_none());
        assert_eq!(acc.pending_len(), 5);

        let record = acc.feed(b" world\n").unwrap().unwrap();
        assert_eq!(record.as_bytes(), b"hello world\n");
        assert!(!acc.has_pending());
    }

    #[test]
    fn empty_feed_is_noop() {
        let mut acc = WriteAccumulator::default();
        acc.feed(b"abc").unwrap();
        assert!(acc.feed(b"").unwrap().is_none());
        assert_eq!(acc.pending_len(), 3);
    }

    #[test]
    fn remainder_starts_next_record() {
        let mut acc = WriteAccumulator::default();
        let first = acc.feed(b"a\nb\nc").unwrap().unwrap();
        assert_eq!(first.as_bytes(), b"a\n");

        let second = acc.next_record().unwrap();
        assert_eq!(second.as_bytes(), b"b\n");
        assert!(acc.next_record().is_none());
        assert_eq!(acc.pending_len(), 1);

        let third = acc.feed(b"d\n").unwrap().unwrap();
        assert_eq!(third.as_bytes(), b"cd\n");
    }

    #[test]
    fn drain_collects_every_record() {
        let mut acc = WriteAccumulator::default();
        let records = acc.drain_records(b"one\ntwo\nthr").unwrap();
        assert_eq!(bytes_of(records), vec![b"one\n".to_vec(), b"two\n".to_vec()]);
        assert_eq!(acc.pending_len(), 3);
    }

    #[test]
    fn lone_delimiter_is_a_record() {
        let mut acc = WriteAccumulator::default();
        let record = acc.feed(b"\n").unwrap().unwrap();
        assert_eq!(record.as_bytes(), b"\n");
    }

    #[test]
    fn custom_delimiter() {
        let mut acc = WriteAccumulator::new(b';');
        assert!(acc.feed(b"a\nb").unwrap().is_none());
        let record = acc.feed(b";").unwrap().unwrap();
        assert_eq!(record.as_bytes(), b"a\nb;");
        assert!(record.is_terminated_by(b';'));
    }

    #[test]
    fn discard_drops_partial() {
        let mut acc = WriteAccumulator::default();
        acc.feed(b"partial").unwrap();
        assert_eq!(acc.discard(), 7);
        assert!(!acc.has_pending());
        let record = acc.feed(b"fresh\n").unwrap().unwrap();
        assert_eq!(record.as_bytes(), b"fresh\n");
    }

    proptest! {
        #[test]
        fn commits_exactly_the_fed_bytes(
            chunks in prop::collection::vec("[a-z]{0,8}", 0..10),
        ) {
            let mut acc = WriteAccumulator::default();
            for chunk in &chunks {
                prop_assert!(acc.feed(chunk.as_bytes()).unwrap().is_none());
            }
            let record = acc.feed(b"\n").unwrap().unwrap();
            let mut expected: Vec<u8> = chunks.concat().into_bytes();
            expected.push(b'\n');
            prop_assert_eq!(record.into_bytes(), expected);
            prop_assert!(!acc.has_pending());
        }
    }
}
