//! # ringlog core
//!
//! The concurrent layer of ringlog.
//!
//! This crate provides:
//! - [`RecordStore`]: one record ring plus every writer's partial record,
//!   behind a single lock whose acquisition gives up when shutdown starts
//! - [`DeviceHandle`]: file-like access to a store (`write`, `read`,
//!   `seek`, record-indexed `seek_to`)
//! - [`TimestampAppender`]: the periodic task that commits timestamp
//!   records through the same lock
//! - [`Shutdown`]: the process-wide shutdown flag every task observes
//!
//! # Example
//!
//! ```rust
//! use ringlog_core::{RecordStore, Shutdown, StoreConfig};
//!
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! rt.block_on(async {
//!     let store = RecordStore::in_memory(StoreConfig::default(), Shutdown::new()).unwrap();
//!     let writer = store.open_writer().await.unwrap();
//!     store.write_chunk(writer, b"hello").await.unwrap();
//!     store.write_chunk(writer, b" world\n").await.unwrap();
//!     assert_eq!(store.read_at(0, 1024).await.unwrap().unwrap(), b"hello world\n");
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod appender;
mod config;
mod device;
mod error;
mod shutdown;
mod store;

pub use appender::{format_timestamp, TimestampAppender, TIMESTAMP_FORMAT};
pub use config::StoreConfig;
pub use device::DeviceHandle;
pub use error::{CoreError, CoreResult};
pub use shutdown::Shutdown;
pub use store::{RecordStore, StoreStats, WriteOutcome, WriterId};

pub use ringlog_storage::{Record, StorageBackend, StorageError};
