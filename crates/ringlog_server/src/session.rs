//! Per-connection session.

use crate::config::ReplyMode;
use crate::error::{ServerError, ServerResult};
use crate::transport::Transport;
use ringlog_core::{CoreError, RecordStore, WriterId};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the next chunk.
    Accumulating,
    /// Committing a received chunk.
    Committing,
    /// Sending the stored stream back.
    Reading,
    /// Finished; the connection is closed.
    Closed,
}

/// What a finished session did.
#[derive(Debug)]
pub struct SessionReport {
    /// Peer description.
    pub peer: String,
    /// Records this session committed.
    pub records_committed: usize,
    /// Bytes received from the client.
    pub bytes_received: u64,
    /// Bytes sent back to the client.
    pub bytes_sent: u64,
    /// Bytes of the unterminated tail discarded at close.
    pub discarded: usize,
    /// Error that ended the session early, if any.
    pub error: Option<ServerError>,
}

impl SessionReport {
    fn new(peer: String) -> Self {
        Self {
            peer,
            records_committed: 0,
            bytes_received: 0,
            bytes_sent: 0,
            discarded: 0,
            error: None,
        }
    }

    /// Returns true if the session ran to completion.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// One client connection feeding a shared store.
///
/// Chunks received are committed through the session's own writer, so
/// partial records never interleave with other sessions. Once the client
/// stops sending, the resident stream is sent back from offset zero and the
/// connection is closed. Any error ends the session without affecting the
/// store beyond records already committed.
pub struct Session<T: Transport> {
    store: Arc<RecordStore>,
    transport: T,
    reply_mode: ReplyMode,
    state: SessionState,
    report: SessionReport,
}

impl<T: Transport> Session<T> {
    /// Creates a session over an accepted transport.
    pub fn new(store: Arc<RecordStore>, transport: T, reply_mode: ReplyMode) -> Self {
        let report = SessionReport::new(transport.peer());
        Self {
            store,
            transport,
            reply_mode,
            state: SessionState::Accumulating,
            report,
        }
    }

    /// Runs the session to completion.
    pub async fn run(self) -> SessionReport {
        let span = info_span!("session", peer = %self.report.peer);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(mut self) -> SessionReport {
        debug!("Session started");

        match self.store.open_writer().await {
            Ok(writer) => {
                if let Err(e) = self.drive(writer).await {
                    self.report.error = Some(e);
                }
                self.release(writer).await;
            }
            Err(e) => self.report.error = Some(e.into()),
        }

        self.state = SessionState::Closed;
        if let Err(e) = self.transport.close().await {
            debug!("Close failed: {}", e);
        }

        match &self.report.error {
            None => info!(
                "Session closed: {} records committed, {} bytes sent",
                self.report.records_committed, self.report.bytes_sent
            ),
            Some(e) if e.is_shutdown() => debug!("Session ended by shutdown"),
            Some(e) if e.is_session_local() => warn!("Session aborted: {}", e),
            Some(e) => error!("Session failed in the store: {}", e),
        }
        self.report
    }

    async fn drive(&mut self, writer: WriterId) -> ServerResult<()> {
        let max_chunk = self.store.config().max_chunk;
        let shutdown = self.store.shutdown().clone();

        loop {
            self.state = SessionState::Accumulating;
            let received = tokio::select! {
                biased;
                () = shutdown.wait() => return Err(CoreError::Interrupted.into()),
                received = self.transport.receive(max_chunk) => received?,
            };
            let Some(chunk) = received else {
                break;
            };
            self.report.bytes_received += chunk.len() as u64;

            self.state = SessionState::Committing;
            let outcome = self.store.write_chunk(writer, &chunk).await?;
            self.report.records_committed += outcome.committed;
            // Evicted records are freed here, after the store lock is gone.
            drop(outcome.evicted);

            if self.reply_mode == ReplyMode::OnCommit && outcome.committed > 0 {
                self.stream_back().await?;
            }
        }

        if self.reply_mode == ReplyMode::OnEndOfInput {
            self.stream_back().await?;
        }
        Ok(())
    }

    async fn stream_back(&mut self) -> ServerResult<()> {
        self.state = SessionState::Reading;
        let max_chunk = self.store.config().max_chunk;
        let mut cursor = 0u64;
        while let Some(extent) = self.store.read_at(cursor, max_chunk).await? {
            if extent.is_empty() {
                break;
            }
            let sent = self.transport.send(&extent).await?;
            cursor += extent.len() as u64;
            self.report.bytes_sent += sent as u64;
        }
        Ok(())
    }

    async fn release(&mut self, writer: WriterId) {
        match self.store.close_writer(writer).await {
            Ok(discarded) => self.report.discarded = discarded,
            Err(e) => {
                debug!("Writer {} not closed cleanly: {}", writer, e);
                self.store.abandon_writer(writer);
            }
        }
    }
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("peer", &self.report.peer)
            .field("state", &self.state)
            .field("reply_mode", &self.reply_mode)
            .finish_non_exhaustive()
    }
}
