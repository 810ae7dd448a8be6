//! Committed record type.

use crate::error::{StorageError, StorageResult};
use std::fmt;

/// The record terminator used when none is configured.
pub const DEFAULT_DELIMITER: u8 = b'\n';

/// An immutable, owned, non-empty run of bytes.
///
/// A record normally ends with its delimiter byte and the delimiter counts
/// toward [`Record::len`]. The type does not enforce the terminator itself
/// because the delimiter is a configuration value; the accumulator and the
/// store only ever build terminated records.
#[derive(Clone, PartialEq, Eq)]
pub struct Record {
    bytes: Box<[u8]>,
}

impl Record {
    /// Creates a record from its bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::EmptyRecord`] if `bytes` is empty.
    pub fn new(bytes: Vec<u8>) -> StorageResult<Self> {
        if bytes.is_empty() {
            return Err(StorageError::EmptyRecord);
        }
        Ok(Self {
            bytes: bytes.into_boxed_slice(),
        })
    }

    /// Wraps bytes already known to be non-empty.
    pub(crate) fn from_nonempty(bytes: Vec<u8>) -> Self {
        debug_assert!(!bytes.is_empty());
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    /// Returns the record bytes, delimiter included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the stored length in bytes. Always at least one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; present for API symmetry with slices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns true if the last byte is `delimiter`.
    #[must_use]
    pub fn is_terminated_by(&self, delimiter: u8) -> bool {
        self.bytes.last() == Some(&delimiter)
    }

    /// Consumes the record, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes.into_vec()
    }
}

impl AsRef<[u8]> for Record {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record({:?})", String::from_utf8_lossy(&self.bytes))
    }
}
