//! # ringlog storage
//!
//! The storage layer of ringlog: a fixed-capacity ring of delimiter
//! terminated records, the per-writer staging area that assembles raw
//! chunks into records, and the byte backends a ring can be mirrored to.
//!
//! Nothing in this crate is synchronized. [`RecordBuffer`] and
//! [`WriteAccumulator`] are plain owned values; the layer above wraps them
//! in a single lock and never hands out references across that lock.
//!
//! ## Design Principles
//!
//! - Records are owned values; eviction hands the evicted record back
//! - Offsets address the logical concatenation of resident records
//! - A read never spans two records
//! - Backends are opaque byte stores with no knowledge of records
//!
//! ## Example
//!
//! ```rust
//! use ringlog_storage::{read_extent, Record, RecordBuffer};
//!
//! let mut ring = RecordBuffer::new(2).unwrap();
//! ring.commit(Record::new(b"a\n".to_vec()).unwrap());
//! ring.commit(Record::new(b"b\n".to_vec()).unwrap());
//! let evicted = ring.commit(Record::new(b"c\n".to_vec()).unwrap());
//! assert_eq!(evicted.unwrap().as_bytes(), b"a\n");
//!
//! assert_eq!(read_extent(&ring, 0, 64), Some(&b"b\n"[..]));
//! assert_eq!(read_extent(&ring, 2, 64), Some(&b"c\n"[..]));
//! assert_eq!(read_extent(&ring, 4, 64), None);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod accumulator;
mod backend;
mod error;
mod file;
mod index;
mod memory;
mod record;
mod ring;

pub use accumulator::WriteAccumulator;
pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use index::read_extent;
pub use memory::InMemoryBackend;
pub use record::{Record, DEFAULT_DELIMITER};
pub use ring::{Iter, RecordBuffer};
