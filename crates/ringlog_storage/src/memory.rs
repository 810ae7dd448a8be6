//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;

/// An in-memory storage backend.
///
/// Keeps the last image in memory. Suitable for:
/// - Unit tests
/// - Stores that need the backend code path without touching disk
///
/// # Example
///
/// ```rust
/// use ringlog_storage::{StorageBackend, InMemoryBackend};
///
/// let mut backend = InMemoryBackend::new();
/// backend.replace(b"a\nb\n").unwrap();
/// assert_eq!(backend.load().unwrap(), b"a\nb\n");
/// assert_eq!(backend.size().unwrap(), 4);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<Vec<u8>>,
    closed: RwLock<bool>,
    flushes: RwLock<u64>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding a previously persisted image.
    ///
    /// Useful for testing restart scenarios.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
            ..Self::default()
        }
    }

    /// Returns a copy of the current image.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Number of successful flushes so far.
    #[must_use]
    pub fn flush_count(&self) -> u64 {
        *self.flushes.read()
    }

    /// Returns true once [`destroy`](StorageBackend::destroy) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.read()
    }

    fn check_open(&self) -> StorageResult<()> {
        if *self.closed.read() {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

impl StorageBackend for InMemoryBackend {
    fn load(&self) -> StorageResult<Vec<u8>> {
        self.check_open()?;
        Ok(self.data.read().clone())
    }

    fn replace(&mut self, contents: &[u8]) -> StorageResult<()> {
        self.check_open()?;
        let mut data = self.data.write();
        data.clear();
        data.extend_from_slice(contents);
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.check_open()?;
        *self.flushes.write() += 1;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        self.check_open()?;
        Ok(self.data.read().len() as u64)
    }

    fn destroy(&mut self) -> StorageResult<()> {
        self.data.write().clear();
        *self.closed.write() = true;
        Ok(())
    }
}
