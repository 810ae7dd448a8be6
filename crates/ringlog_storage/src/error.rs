//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred in a persistence backend.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Growing a buffer failed.
    #[error("allocation of {requested} bytes failed")]
    Allocation {
        /// Number of additional bytes that could not be reserved.
        requested: usize,
    },

    /// A record must hold at least one byte.
    #[error("records cannot be empty")]
    EmptyRecord,

    /// A ring needs room for at least one record.
    #[error("invalid ring capacity: {0}")]
    InvalidCapacity(usize),

    /// The backend has been destroyed.
    #[error("storage is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StorageError::Allocation { requested: 4096 };
        assert!(err.to_string().contains("4096"));
        assert_eq!(StorageError::EmptyRecord.to_string(), "records cannot be empty");
    }
}
