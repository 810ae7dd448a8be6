//! Storage backend trait definition.

use crate::error::StorageResult;

/// A byte store that mirrors the resident records of a ring.
///
/// Backends are **opaque byte stores**. The ring above them decides what
/// the bytes mean; a backend only keeps the latest image it was given and
/// hands it back on the next start.
///
/// # Invariants
///
/// - `load` returns exactly the bytes passed to the last `replace`
/// - `flush` makes the last `replace` survive process termination
/// - after `destroy`, every other call fails with `StorageError::Closed`
/// - Backends must be `Send + Sync` so a store can move between tasks
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For a file on disk
pub trait StorageBackend: Send + Sync {
    /// Returns the full persisted image.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is closed or an I/O error occurs.
    fn load(&self) -> StorageResult<Vec<u8>>;

    /// Replaces the persisted image with `contents`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is closed or an I/O error occurs.
    fn replace(&mut self, contents: &[u8]) -> StorageResult<()>;

    /// Pushes the last image to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the size of the persisted image in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is closed or the size cannot be
    /// determined.
    fn size(&self) -> StorageResult<u64>;

    /// Removes the persisted image entirely and closes the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be removed.
    fn destroy(&mut self) -> StorageResult<()>;
}
