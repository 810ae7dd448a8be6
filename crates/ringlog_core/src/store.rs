//! The guarded record store.

use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::shutdown::Shutdown;
use ringlog_storage::{read_extent, Record, RecordBuffer, StorageBackend, WriteAccumulator};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// Identifies one writer's partial record inside a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WriterId(u64);

impl fmt::Display for WriterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// What a call to [`RecordStore::write_chunk`] did.
///
/// Evicted records are handed back so the caller drops them after the
/// store lock has been released.
#[derive(Debug, Default)]
pub struct WriteOutcome {
    /// Records completed and committed by this chunk.
    pub committed: usize,
    /// Records pushed out of the ring by those commits, oldest first.
    pub evicted: Vec<Record>,
    /// Bytes still waiting for a delimiter after this chunk.
    pub pending: usize,
}

/// Point-in-time counters of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Resident records.
    pub records: usize,
    /// Maximum resident records.
    pub capacity: usize,
    /// Bytes in the logical stream.
    pub total_len: u64,
    /// Open writers.
    pub writers: usize,
    /// Bytes held in partial records across all writers.
    pub pending_bytes: usize,
    /// Records committed since open, including replayed ones.
    pub commits: u64,
    /// Records evicted since open.
    pub evictions: u64,
    /// Mirror writes to the backend that failed.
    pub persist_failures: u64,
}

struct StoreState {
    ring: RecordBuffer,
    writers: HashMap<WriterId, WriteAccumulator>,
    commits: u64,
    evictions: u64,
    /// Sequence number of the last image handed to the mirror.
    image_seq: u64,
    torn_down: bool,
}

impl StoreState {
    fn commit(&mut self, record: Record) -> Option<Record> {
        self.commits += 1;
        let evicted = self.ring.commit(record);
        if evicted.is_some() {
            self.evictions += 1;
        }
        evicted
    }

    /// Copies the resident records into a numbered backend image.
    fn next_image(&mut self) -> (u64, Vec<u8>) {
        self.image_seq += 1;
        let mut image = Vec::with_capacity(self.ring.total_len() as usize);
        for record in &self.ring {
            image.extend_from_slice(record.as_bytes());
        }
        (self.image_seq, image)
    }
}

/// The backend side of a store.
///
/// Images are built under the store lock but written here, on the blocking
/// pool, so file I/O never runs while the lock is held. An image older than
/// the last one written is skipped.
struct Mirror {
    state: parking_lot::Mutex<MirrorState>,
    failures: AtomicU64,
}

struct MirrorState {
    backend: Option<Box<dyn StorageBackend>>,
    written: u64,
}

impl Mirror {
    fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            state: parking_lot::Mutex::new(MirrorState {
                backend: Some(backend),
                written: 0,
            }),
            failures: AtomicU64::new(0),
        }
    }

    /// Rewrites the backend with image `seq` and flushes it.
    ///
    /// The ring is the source of truth, so a failure is logged and counted
    /// rather than undoing the commit that produced the image.
    fn write(&self, seq: u64, image: &[u8]) {
        let mut state = self.state.lock();
        if seq <= state.written {
            return;
        }
        state.written = seq;
        let Some(backend) = state.backend.as_mut() else {
            return;
        };
        let result = match backend.replace(image) {
            Ok(()) => backend.flush(),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.record_failure();
            error!("Failed to persist {} bytes: {}", image.len(), e);
        }
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    fn take_backend(&self) -> Option<Box<dyn StorageBackend>> {
        self.state.lock().backend.take()
    }
}

/// A bounded record ring shared by concurrent writers and readers.
///
/// The ring and every writer's partial record sit behind one async mutex.
/// Acquiring it races the store's [`Shutdown`] flag: a caller still waiting
/// when shutdown triggers gets [`CoreError::Interrupted`] instead of
/// blocking the shutdown.
///
/// Reads copy bytes out under the lock; no reference into the ring ever
/// outlives it. With a backend, every commit produces an image of the
/// resident records that is written after the lock is released.
pub struct RecordStore {
    config: StoreConfig,
    state: Mutex<StoreState>,
    mirror: Option<Arc<Mirror>>,
    shutdown: Shutdown,
    next_writer: AtomicU64,
    /// Writers dropped while the lock was busy; discarded on next lock.
    orphans: parking_lot::Mutex<Vec<WriterId>>,
}

impl RecordStore {
    /// Opens a store, replaying any image persisted in `backend`.
    ///
    /// Complete records in the image are committed in order, so only the
    /// newest `capacity` of them stay resident. A trailing partial record
    /// is dropped. If replay dropped anything, the trimmed image is written
    /// back before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the backend
    /// cannot be read.
    pub fn open(
        config: StoreConfig,
        backend: Option<Box<dyn StorageBackend>>,
        shutdown: Shutdown,
    ) -> CoreResult<Self> {
        config.validate()?;

        let mut state = StoreState {
            ring: RecordBuffer::new(config.capacity)?,
            writers: HashMap::new(),
            commits: 0,
            evictions: 0,
            image_seq: 0,
            torn_down: false,
        };

        let mirror = match backend {
            Some(backend) => {
                let image = backend.load()?;
                let mut replay = WriteAccumulator::new(config.delimiter);
                let records = replay.drain_records(&image)?;
                let replayed = records.len();
                for record in records {
                    state.commit(record);
                }
                if replay.has_pending() {
                    warn!(
                        "Dropping {} trailing bytes without delimiter from persisted image",
                        replay.pending_len()
                    );
                }
                info!(
                    "Replayed {} records ({} resident) from {} persisted bytes",
                    replayed,
                    state.ring.len(),
                    image.len()
                );

                let mirror = Mirror::new(backend);
                if state.ring.total_len() != image.len() as u64 {
                    let (seq, trimmed) = state.next_image();
                    mirror.write(seq, &trimmed);
                }
                Some(Arc::new(mirror))
            }
            None => None,
        };

        Ok(Self {
            config,
            state: Mutex::new(state),
            mirror,
            shutdown,
            next_writer: AtomicU64::new(1),
            orphans: parking_lot::Mutex::new(Vec::new()),
        })
    }

    /// Opens a store with no backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn in_memory(config: StoreConfig, shutdown: Shutdown) -> CoreResult<Self> {
        Self::open(config, None, shutdown)
    }

    /// The configuration the store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The shutdown flag the store observes.
    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    async fn lock(&self) -> CoreResult<MutexGuard<'_, StoreState>> {
        let mut state = tokio::select! {
            biased;
            state = self.state.lock() => state,
            () = self.shutdown.wait() => return Err(CoreError::Interrupted),
        };
        if state.torn_down {
            return Err(CoreError::Closed);
        }
        self.reap_orphans(&mut state);
        Ok(state)
    }

    fn reap_orphans(&self, state: &mut StoreState) {
        let orphans = std::mem::take(&mut *self.orphans.lock());
        for id in orphans {
            if let Some(mut acc) = state.writers.remove(&id) {
                debug!("Discarding {} pending bytes of dropped writer {}", acc.discard(), id);
            }
        }
    }

    /// Registers a new writer with an empty partial record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Interrupted`] or [`CoreError::Closed`].
    pub async fn open_writer(&self) -> CoreResult<WriterId> {
        let id = WriterId(self.next_writer.fetch_add(1, Ordering::Relaxed));
        let mut state = self.lock().await?;
        state
            .writers
            .insert(id, WriteAccumulator::new(self.config.delimiter));
        debug!("Opened writer {}", id);
        Ok(id)
    }

    /// Unregisters a writer, discarding its partial record.
    ///
    /// Returns the number of discarded bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownWriter`] if the writer is not open.
    pub async fn close_writer(&self, id: WriterId) -> CoreResult<usize> {
        let mut state = self.lock().await?;
        let mut acc = state
            .writers
            .remove(&id)
            .ok_or(CoreError::UnknownWriter(id))?;
        let discarded = acc.discard();
        if discarded > 0 {
            debug!("Writer {} closed with {} uncommitted bytes", id, discarded);
        }
        Ok(discarded)
    }

    /// Unregisters a writer without waiting for the lock.
    ///
    /// Used from `Drop` and error paths. If the lock is busy the writer is
    /// queued and discarded by the next caller that acquires it.
    pub fn abandon_writer(&self, id: WriterId) {
        match self.state.try_lock() {
            Ok(mut state) => {
                state.writers.remove(&id);
            }
            Err(_) => self.orphans.lock().push(id),
        }
    }

    /// Feeds a chunk to a writer's partial record and commits every record
    /// it completes.
    ///
    /// Bytes after a delimiter stay pending as the start of the next
    /// record. On error nothing is committed and the partial record is
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownWriter`], an allocation failure, or a
    /// lock error.
    pub async fn write_chunk(&self, id: WriterId, bytes: &[u8]) -> CoreResult<WriteOutcome> {
        let mut guard = self.lock().await?;
        let state = &mut *guard;

        let acc = state
            .writers
            .get_mut(&id)
            .ok_or(CoreError::UnknownWriter(id))?;
        let records = acc.drain_records(bytes)?;
        let pending = acc.pending_len();

        let mut outcome = WriteOutcome {
            pending,
            ..WriteOutcome::default()
        };
        for record in records {
            debug!("Writer {} committed {:?}", id, record);
            outcome.committed += 1;
            if let Some(old) = state.commit(record) {
                outcome.evicted.push(old);
            }
        }
        let mirrored = outcome.committed > 0 && self.mirror.is_some();
        let image = mirrored.then(|| state.next_image());
        drop(guard);

        if let Some((seq, image)) = image {
            self.persist(seq, image).await;
        }
        Ok(outcome)
    }

    /// Commits a complete record that did not come from a writer.
    ///
    /// Returns the evicted record, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingDelimiter`] if `bytes` does not end with
    /// the delimiter, or a lock error.
    pub async fn append_system_record(&self, bytes: &[u8]) -> CoreResult<Option<Record>> {
        if bytes.last() != Some(&self.config.delimiter) {
            return Err(CoreError::MissingDelimiter {
                delimiter: self.config.delimiter,
            });
        }
        let record = Record::new(bytes.to_vec())?;

        let mut state = self.lock().await?;
        debug!("System record {:?}", record);
        let evicted = state.commit(record);
        let image = self.mirror.is_some().then(|| state.next_image());
        drop(state);

        if let Some((seq, image)) = image {
            self.persist(seq, image).await;
        }
        Ok(evicted)
    }

    /// Writes a backend image on the blocking pool.
    ///
    /// Called after the store lock is released. Commits stand whether or
    /// not the write succeeds.
    async fn persist(&self, seq: u64, image: Vec<u8>) {
        let Some(mirror) = self.mirror.as_ref() else {
            return;
        };
        let task = {
            let mirror = Arc::clone(mirror);
            tokio::task::spawn_blocking(move || mirror.write(seq, &image))
        };
        if let Err(e) = task.await {
            mirror.record_failure();
            error!("Persist task for image {} failed: {}", seq, e);
        }
    }

    /// Reads one extent starting at `offset`.
    ///
    /// The extent never crosses a record boundary and is at most
    /// `max_len` bytes. `None` means `offset` is at or past the end of the
    /// stream.
    ///
    /// # Errors
    ///
    /// Returns a lock error.
    pub async fn read_at(&self, offset: u64, max_len: usize) -> CoreResult<Option<Vec<u8>>> {
        let state = self.lock().await?;
        Ok(read_extent(&state.ring, offset, max_len).map(<[u8]>::to_vec))
    }

    /// Size in bytes of the logical stream.
    ///
    /// # Errors
    ///
    /// Returns a lock error.
    pub async fn total_len(&self) -> CoreResult<u64> {
        Ok(self.lock().await?.ring.total_len())
    }

    /// Absolute offset of byte `intra` of the `index`-th resident record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSeek`] if either is out of range.
    pub async fn offset_of(&self, index: usize, intra: usize) -> CoreResult<u64> {
        let state = self.lock().await?;
        state.ring.offset_of(index, intra).ok_or_else(|| {
            CoreError::InvalidSeek(format!(
                "record {} byte {} is outside the {} resident records",
                index,
                intra,
                state.ring.len()
            ))
        })
    }

    /// Copies every resident record, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a lock error.
    pub async fn snapshot(&self) -> CoreResult<Vec<Vec<u8>>> {
        let state = self.lock().await?;
        Ok(state.ring.iter().map(|r| r.as_bytes().to_vec()).collect())
    }

    /// Returns current counters.
    ///
    /// # Errors
    ///
    /// Returns a lock error.
    pub async fn stats(&self) -> CoreResult<StoreStats> {
        let state = self.lock().await?;
        Ok(StoreStats {
            records: state.ring.len(),
            capacity: state.ring.capacity(),
            total_len: state.ring.total_len(),
            writers: state.writers.len(),
            pending_bytes: state.writers.values().map(WriteAccumulator::pending_len).sum(),
            commits: state.commits,
            evictions: state.evictions,
            persist_failures: self.mirror.as_ref().map_or(0, |m| m.failures()),
        })
    }

    /// Releases everything the store owns.
    ///
    /// Returns the resident records oldest first. Partial records are
    /// discarded. The backend is destroyed or flushed depending on
    /// [`StoreConfig::destroy_backend_on_teardown`]. Later calls on the
    /// store fail with [`CoreError::Closed`]; a second teardown returns an
    /// empty list.
    ///
    /// This waits for the lock without observing shutdown, since it is
    /// the last step of shutdown. A kept backend receives the final image
    /// before it is flushed, so no commit is lost to a persist still in
    /// flight.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be destroyed or flushed.
    pub async fn teardown(&self) -> CoreResult<Vec<Record>> {
        let mut state = self.state.lock().await;
        if state.torn_down {
            return Ok(Vec::new());
        }
        state.torn_down = true;

        let destroy = self.config.destroy_backend_on_teardown;
        let last_image = (self.mirror.is_some() && !destroy).then(|| state.next_image());

        let discarded: usize = state.writers.values_mut().map(WriteAccumulator::discard).sum();
        let writers = state.writers.len();
        state.writers.clear();
        let records = state.ring.teardown();
        info!(
            "Store torn down: {} records released, {} writers dropped with {} pending bytes",
            records.len(),
            writers,
            discarded
        );

        drop(state);

        if let Some(mirror) = self.mirror.as_ref().map(Arc::clone) {
            tokio::task::spawn_blocking(move || -> CoreResult<()> {
                if let Some((seq, image)) = last_image {
                    mirror.write(seq, &image);
                }
                if let Some(mut backend) = mirror.take_backend() {
                    if destroy {
                        backend.destroy()?;
                    } else {
                        backend.flush()?;
                    }
                }
                Ok(())
            })
            .await??;
        }
        Ok(records)
    }
}

impl fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
