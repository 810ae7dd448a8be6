//! File-like access to a store.

use crate::error::{CoreError, CoreResult};
use crate::store::{RecordStore, WriterId};
use std::io::SeekFrom;
use std::sync::Arc;
use tracing::debug;

/// An open handle on a store, with the semantics of a character device.
///
/// - `write` feeds the handle's own partial record; complete records are
///   committed immediately. Writes always append and never move the read
///   position.
/// - `read` returns at most one record's worth of bytes from the current
///   position and advances it; `0` means end of stream.
/// - `seek` moves the read position (`SeekFrom::End` is relative to the
///   current stream length).
/// - `seek_to` moves it to a byte inside the n-th resident record.
///
/// Call [`release`](Self::release) when done. A handle dropped without
/// release still discards its partial record, just less eagerly.
///
/// # Example
///
/// ```rust
/// use ringlog_core::{DeviceHandle, RecordStore, Shutdown, StoreConfig};
/// use std::sync::Arc;
///
/// let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// rt.block_on(async {
///     let store =
///         Arc::new(RecordStore::in_memory(StoreConfig::default(), Shutdown::new()).unwrap());
///     let mut handle = DeviceHandle::open(Arc::clone(&store)).await.unwrap();
///     handle.write(b"write1\n").await.unwrap();
///
///     let mut buf = [0u8; 64];
///     let n = handle.read(&mut buf).await.unwrap();
///     assert_eq!(&buf[..n], b"write1\n");
///     handle.release().await.unwrap();
/// });
/// ```
#[derive(Debug)]
pub struct DeviceHandle {
    store: Arc<RecordStore>,
    writer: Option<WriterId>,
    position: u64,
}

impl DeviceHandle {
    /// Opens a handle positioned at the start of the stream.
    ///
    /// # Errors
    ///
    /// Returns a lock error if the store is shutting down or closed.
    pub async fn open(store: Arc<RecordStore>) -> CoreResult<Self> {
        let writer = store.open_writer().await?;
        debug!("Device handle opened as {}", writer);
        Ok(Self {
            store,
            writer: Some(writer),
            position: 0,
        })
    }

    /// Current read position.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn writer(&self) -> CoreResult<WriterId> {
        self.writer.ok_or(CoreError::Closed)
    }

    /// Writes `buf`, committing any record it completes.
    ///
    /// Returns the number of bytes accepted, which is always `buf.len()`.
    ///
    /// # Errors
    ///
    /// Returns an allocation or lock error; nothing is accepted in that
    /// case.
    pub async fn write(&mut self, buf: &[u8]) -> CoreResult<usize> {
        let outcome = self.store.write_chunk(self.writer()?, buf).await?;
        drop(outcome.evicted);
        Ok(buf.len())
    }

    /// Reads from the current position into `buf`.
    ///
    /// Never copies bytes from more than one record.
    ///
    /// # Errors
    ///
    /// Returns a lock error.
    pub async fn read(&mut self, buf: &mut [u8]) -> CoreResult<usize> {
        let Some(extent) = self.store.read_at(self.position, buf.len()).await? else {
            return Ok(0);
        };
        buf[..extent.len()].copy_from_slice(&extent);
        self.position += extent.len() as u64;
        Ok(extent.len())
    }

    /// Reads from the current position until end of stream.
    ///
    /// # Errors
    ///
    /// Returns a lock error.
    pub async fn read_to_end(&mut self, out: &mut Vec<u8>) -> CoreResult<usize> {
        let max = self.store.config().max_chunk;
        let mut total = 0;
        while let Some(extent) = self.store.read_at(self.position, max).await? {
            if extent.is_empty() {
                break;
            }
            self.position += extent.len() as u64;
            total += extent.len();
            out.extend_from_slice(&extent);
        }
        Ok(total)
    }

    /// Moves the read position.
    ///
    /// Positions past the end are allowed and read as end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSeek`] if the target would be negative
    /// or overflow.
    pub async fn seek(&mut self, pos: SeekFrom) -> CoreResult<u64> {
        let (base, delta) = match pos {
            SeekFrom::Start(offset) => (offset, 0),
            SeekFrom::Current(delta) => (self.position, delta),
            SeekFrom::End(delta) => (self.store.total_len().await?, delta),
        };
        let target = base
            .checked_add_signed(delta)
            .ok_or_else(|| CoreError::InvalidSeek(format!("{:?} from {}", pos, base)))?;
        debug!("Seek to {}", target);
        self.position = target;
        Ok(target)
    }

    /// Moves the read position to byte `intra` of the `index`-th resident
    /// record, counting from the oldest.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSeek`] if the record or the byte does
    /// not exist.
    pub async fn seek_to(&mut self, index: u32, intra: u32) -> CoreResult<u64> {
        let target = self.store.offset_of(index as usize, intra as usize).await?;
        self.position = target;
        Ok(target)
    }

    /// Closes the handle, discarding any partial record.
    ///
    /// Returns the number of discarded bytes.
    ///
    /// # Errors
    ///
    /// Returns a lock error. The partial record is still discarded later.
    pub async fn release(mut self) -> CoreResult<usize> {
        let writer = self.writer()?;
        let discarded = self.store.close_writer(writer).await?;
        self.writer = None;
        Ok(discarded)
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            self.store.abandon_writer(writer);
        }
    }
}
