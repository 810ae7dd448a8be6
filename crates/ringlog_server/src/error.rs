//! Error types for the record server.

use ringlog_core::CoreError;
use ringlog_storage::StorageError;
use std::net::SocketAddr;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the record server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    BindFailed {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Sending to or receiving from a client failed.
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),

    /// The store rejected an operation.
    #[error("store error: {0}")]
    Core(#[from] CoreError),

    /// The data file could not be opened.
    #[error("data file error: {0}")]
    Storage(#[from] StorageError),
}

impl ServerError {
    /// Returns true if the error concerns one client connection only.
    pub fn is_session_local(&self) -> bool {
        matches!(self, ServerError::Transport(_))
    }

    /// Returns true if the error is the result of shutdown.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, ServerError::Core(e) if e.is_terminal())
    }
}
