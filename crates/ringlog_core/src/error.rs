//! Error types for ringlog core.

use crate::store::WriterId;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage layer error (allocation, backend I/O).
    #[error("storage error: {0}")]
    Storage(#[from] ringlog_storage::StorageError),

    /// Waiting for the store lock was cut short by shutdown.
    #[error("interrupted by shutdown")]
    Interrupted,

    /// The store has been torn down.
    #[error("store is closed")]
    Closed,

    /// Configuration rejected at open time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The writer was never opened or has already been closed.
    #[error("unknown writer {0}")]
    UnknownWriter(WriterId),

    /// A record handed over whole did not end with the delimiter.
    #[error("record does not end with delimiter {delimiter:#04x}")]
    MissingDelimiter {
        /// The configured delimiter.
        delimiter: u8,
    },

    /// A seek target outside the resident stream.
    #[error("invalid seek: {0}")]
    InvalidSeek(String),

    /// A blocking backend task panicked or was cancelled.
    #[error("backend task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl CoreError {
    /// Returns true if the operation was abandoned because of shutdown.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, CoreError::Interrupted)
    }

    /// Returns true if the store can no longer serve requests, either
    /// because shutdown interrupted the caller or because it was torn down.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CoreError::Interrupted | CoreError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringlog_storage::StorageError;

    #[test]
    fn error_classification() {
        assert!(CoreError::Interrupted.is_interrupted());
        assert!(CoreError::Interrupted.is_terminal());
        assert!(CoreError::Closed.is_terminal());
        assert!(!CoreError::InvalidSeek("x".into()).is_terminal());
    }

    #[test]
    fn error_display() {
        let err = CoreError::MissingDelimiter { delimiter: b'\n' };
        assert!(err.to_string().contains("0x0a"));

        let err: CoreError = StorageError::Allocation { requested: 7 }.into();
        assert!(err.to_string().contains("7 bytes"));
    }
}
