//! Fixed-capacity ring of committed records.

use crate::error::{StorageError, StorageResult};
use crate::record::Record;

/// A fixed-capacity circular buffer of records.
///
/// Records are kept in insertion order. Once the ring is full, every
/// commit evicts the oldest record and hands it back to the caller, who
/// decides when to drop it (typically after releasing whatever lock
/// protects the ring).
///
/// # Invariants
///
/// - `len() <= capacity()`
/// - walking from the oldest slot yields records in commit order
/// - `total_len()` equals the sum of resident record lengths
///
/// # Example
///
/// ```rust
/// use ringlog_storage::{Record, RecordBuffer};
///
/// let mut ring = RecordBuffer::new(3).unwrap();
/// for line in ["one\n", "two\n", "three\n", "four\n"] {
///     ring.commit(Record::new(line.as_bytes().to_vec()).unwrap());
/// }
/// let lines: Vec<_> = ring.iter().map(|r| r.as_bytes().to_vec()).collect();
/// assert_eq!(lines, vec![b"two\n".to_vec(), b"three\n".to_vec(), b"four\n".to_vec()]);
/// ```
#[derive(Debug)]
pub struct RecordBuffer {
    slots: Vec<Option<Record>>,
    /// Next slot to fill.
    head: usize,
    /// Number of occupied slots.
    len: usize,
    total_len: u64,
}

impl RecordBuffer {
    /// Creates an empty ring able to hold `capacity` records.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> StorageResult<Self> {
        if capacity == 0 {
            return Err(StorageError::InvalidCapacity(capacity));
        }
        let mut slots = Vec::new();
        slots.resize_with(capacity, || None);
        Ok(Self {
            slots,
            head: 0,
            len: 0,
            total_len: 0,
        })
    }

    /// Maximum number of resident records.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of resident records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no record is resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if the next commit will evict.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Size in bytes of the logical concatenation of resident records.
    #[must_use]
    pub fn total_len(&self) -> u64 {
        self.total_len
    }

    /// Inserts `record` as the newest entry.
    ///
    /// Returns the evicted oldest record when the ring was already full.
    pub fn commit(&mut self, record: Record) -> Option<Record> {
        let evicted = if self.is_full() {
            self.slots[self.head].take()
        } else {
            None
        };
        if let Some(old) = &evicted {
            self.total_len -= old.len() as u64;
        }

        self.total_len += record.len() as u64;
        self.slots[self.head] = Some(record);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        evicted
    }

    /// Returns the record at `index`, counted from the oldest resident one.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Record> {
        if index >= self.len {
            return None;
        }
        let slot = (self.oldest_slot() + index) % self.capacity();
        self.slots[slot].as_ref()
    }

    /// Locates the record containing the absolute `offset`.
    ///
    /// Each record covers the half-open range `[start, start + len)`.
    /// Returns the record and the offset within it, or `None` when
    /// `offset` is at or beyond [`total_len`](Self::total_len).
    #[must_use]
    pub fn find_offset(&self, offset: u64) -> Option<(&Record, usize)> {
        if offset >= self.total_len {
            return None;
        }
        let mut start = 0u64;
        for record in self.iter() {
            let end = start + record.len() as u64;
            if offset < end {
                return Some((record, (offset - start) as usize));
            }
            start = end;
        }
        None
    }

    /// Maps a record index and an offset inside that record to an absolute
    /// offset. Returns `None` if either is out of range.
    #[must_use]
    pub fn offset_of(&self, index: usize, intra: usize) -> Option<u64> {
        let target = self.get(index)?;
        if intra >= target.len() {
            return None;
        }
        let preceding: u64 = self.iter().take(index).map(|r| r.len() as u64).sum();
        Some(preceding + intra as u64)
    }

    /// Iterates resident records from oldest to newest.
    ///
    /// Every call starts a fresh traversal of the current contents.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            ring: self,
            next: 0,
        }
    }

    /// Removes every resident record, oldest first, leaving the ring empty.
    pub fn teardown(&mut self) -> Vec<Record> {
        let oldest = self.oldest_slot();
        let capacity = self.capacity();
        let mut records = Vec::with_capacity(self.len);
        for i in 0..self.len {
            if let Some(record) = self.slots[(oldest + i) % capacity].take() {
                records.push(record);
            }
        }
        self.head = 0;
        self.len = 0;
        self.total_len = 0;
        records
    }

    fn oldest_slot(&self) -> usize {
        (self.head + self.capacity() - self.len) % self.capacity()
    }
}

/// Oldest-first iterator over a [`RecordBuffer`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    ring: &'a RecordBuffer,
    next: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Record;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.ring.get(self.next)?;
        self.next += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.ring.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl<'a> IntoIterator for &'a RecordBuffer {
    type Item = &'a Record;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
