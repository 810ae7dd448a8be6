//! The record server.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::registry::SessionRegistry;
use crate::session::Session;
use crate::transport::TcpTransport;
use ringlog_core::{RecordStore, Shutdown, StorageBackend, TimestampAppender};
use ringlog_storage::FileBackend;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// What the server did before it stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerSummary {
    /// Sessions that ran to completion.
    pub sessions_completed: u64,
    /// Sessions that ended with an error.
    pub sessions_failed: u64,
    /// Connections dropped because the session limit was reached.
    pub connections_rejected: u64,
    /// Timestamp records appended.
    pub timestamps_appended: u64,
    /// Records still resident when the store was torn down.
    pub records_released: usize,
}

/// A record server that has not started listening yet.
#[derive(Debug)]
pub struct RecordServer {
    config: ServerConfig,
    store: Arc<RecordStore>,
}

impl RecordServer {
    /// Opens the store described by `config`.
    ///
    /// With a data file configured, the store is mirrored to it and starts
    /// from whatever complete records the file already holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the data file cannot be opened or the store
    /// configuration is invalid.
    pub fn open(config: ServerConfig, shutdown: Shutdown) -> ServerResult<Self> {
        let backend: Option<Box<dyn StorageBackend>> = match &config.data_file {
            Some(path) => {
                info!("Mirroring records to {}", path.display());
                Some(Box::new(FileBackend::open_with_create_dirs(path)?))
            }
            None => None,
        };
        let store = RecordStore::open(config.store.clone(), backend, shutdown)?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Creates a server over an existing store.
    ///
    /// The store's own configuration and shutdown flag are used; the store
    /// fields of `config` are ignored.
    pub fn with_store(config: ServerConfig, store: Arc<RecordStore>) -> Self {
        Self { config, store }
    }

    /// The store this server feeds.
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// The configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Binds the listening socket.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::BindFailed`] if the address is unavailable.
    pub async fn bind(self) -> ServerResult<BoundServer> {
        let addr = self.config.bind_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::BindFailed { addr, source })?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {}", local_addr);
        Ok(BoundServer {
            server: self,
            listener,
            local_addr,
        })
    }
}

/// A record server with its listening socket bound.
#[derive(Debug)]
pub struct BoundServer {
    server: RecordServer,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl BoundServer {
    /// The address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The store this server feeds.
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.server.store
    }

    /// Accepts connections until the store's shutdown flag is triggered.
    ///
    /// Each connection runs as its own session task. On shutdown the
    /// listener is closed, remaining sessions are drained, the timestamp
    /// task is stopped and the store is torn down.
    ///
    /// # Errors
    ///
    /// Returns an error if the final teardown fails. Per-connection errors
    /// never stop the server.
    pub async fn run(self) -> ServerResult<ServerSummary> {
        let BoundServer {
            server: RecordServer { config, store },
            listener,
            local_addr,
        } = self;
        let shutdown = store.shutdown().clone();
        let mut summary = ServerSummary::default();

        let appender = config
            .timestamp_interval
            .map(|period| TimestampAppender::new(Arc::clone(&store), period).spawn());

        let mut registry = SessionRegistry::new();
        let mut reap = interval(config.reap_interval);
        reap.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                () = shutdown.wait() => {
                    info!("Shutdown signal received, no longer accepting on {}", local_addr);
                    break;
                }

                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            continue;
                        }
                    };

                    if registry.active() >= config.max_sessions {
                        registry.reap();
                    }
                    if registry.active() >= config.max_sessions {
                        warn!("Session limit ({}) reached, dropping {}", config.max_sessions, peer);
                        summary.connections_rejected += 1;
                        continue;
                    }

                    debug!("Accepted connection from {}", peer);
                    let session = Session::new(
                        Arc::clone(&store),
                        TcpTransport::new(stream, peer),
                        config.reply_mode,
                    );
                    registry.spawn(session.run());
                }

                _ = reap.tick() => {
                    registry.reap();
                }
            }
        }

        drop(listener);

        let draining = registry.active();
        if draining > 0 {
            info!("Waiting for {} sessions to finish", draining);
        }
        registry.drain().await;
        summary.sessions_completed = registry.completed();
        summary.sessions_failed = registry.failed();

        if let Some(handle) = appender {
            match handle.await {
                Ok(appended) => summary.timestamps_appended = appended,
                Err(e) => error!("Timestamp task failed: {}", e),
            }
        }

        let released = store.teardown().await?;
        summary.records_released = released.len();
        drop(released);

        info!(
            "Server stopped: {} sessions completed, {} failed, {} records released",
            summary.sessions_completed, summary.sessions_failed, summary.records_released
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringlog_core::StoreConfig;

    fn test_config() -> ServerConfig {
        ServerConfig::new("127.0.0.1:0".parse().unwrap())
            .with_timestamp_interval(None)
            .with_data_file(None)
    }

    #[tokio::test]
    async fn bind_reports_local_addr() {
        let server = RecordServer::open(test_config(), Shutdown::new()).unwrap();
        let bound = server.bind().await.unwrap();
        assert_ne!(bound.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let first = RecordServer::open(test_config(), Shutdown::new())
            .unwrap()
            .bind()
            .await
            .unwrap();

        let config = test_config();
        let taken = ServerConfig {
            bind_addr: first.local_addr(),
            ..config
        };
        let err = RecordServer::open(taken, Shutdown::new())
            .unwrap()
            .bind()
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::BindFailed { .. }));
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let shutdown = Shutdown::new();
        let server = RecordServer::open(test_config(), shutdown.clone()).unwrap();
        let bound = server.bind().await.unwrap();
        let store = Arc::clone(bound.store());
        let task = tokio::spawn(bound.run());

        shutdown.trigger();
        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary, ServerSummary::default());
        assert!(store.stats().await.is_err());
    }

    #[tokio::test]
    async fn data_file_is_removed_after_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ringlogdata");
        let shutdown = Shutdown::new();
        let config = test_config().with_data_file(Some(path.clone()));

        let server = RecordServer::open(config, shutdown.clone()).unwrap();
        assert!(path.exists());
        let bound = server.bind().await.unwrap();
        let task = tokio::spawn(bound.run());

        shutdown.trigger();
        task.await.unwrap().unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn data_file_can_be_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ringlogdata");
        std::fs::write(&path, b"old\n").unwrap();

        let shutdown = Shutdown::new();
        let config = test_config()
            .with_data_file(Some(path.clone()))
            .with_store(StoreConfig::new().destroy_backend_on_teardown(false));
        let server = RecordServer::open(config, shutdown.clone()).unwrap();
        assert_eq!(server.store().snapshot().await.unwrap(), vec![b"old\n".to_vec()]);

        let task = tokio::spawn(server.bind().await.unwrap().run());
        shutdown.trigger();
        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.records_released, 1);
        assert_eq!(std::fs::read(&path).unwrap(), b"old\n");
    }
}
