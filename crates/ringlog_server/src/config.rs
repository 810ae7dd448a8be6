//! Server configuration.

use ringlog_core::StoreConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default location of the mirrored record file.
pub const DEFAULT_DATA_FILE: &str = "/var/tmp/ringlogdata";

/// When a session sends the stored stream back to its client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyMode {
    /// Once, after the client half-closes its side.
    #[default]
    OnEndOfInput,
    /// After every chunk that completed at least one record. Suits clients
    /// that never half-close and read until the server goes quiet.
    OnCommit,
}

/// Configuration for the record server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Store the server opens.
    pub store: StoreConfig,
    /// Maximum concurrent sessions; further connections are dropped.
    pub max_sessions: usize,
    /// How often finished sessions are reaped.
    pub reap_interval: Duration,
    /// Period of timestamp records, `None` to disable them.
    pub timestamp_interval: Option<Duration>,
    /// When sessions reply.
    pub reply_mode: ReplyMode,
    /// File the store is mirrored to, `None` to keep records in memory only.
    pub data_file: Option<PathBuf>,
}

impl ServerConfig {
    /// Creates a new server configuration.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            store: StoreConfig::default(),
            max_sessions: 1000,
            reap_interval: Duration::from_secs(5),
            timestamp_interval: Some(Duration::from_secs(10)),
            reply_mode: ReplyMode::default(),
            data_file: Some(PathBuf::from(DEFAULT_DATA_FILE)),
        }
    }

    /// Sets the store configuration.
    #[must_use]
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Sets the maximum concurrent sessions.
    #[must_use]
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }

    /// Sets the reap interval.
    #[must_use]
    pub fn with_reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    /// Sets the timestamp period, or disables timestamps with `None`.
    #[must_use]
    pub fn with_timestamp_interval(mut self, interval: Option<Duration>) -> Self {
        self.timestamp_interval = interval;
        self
    }

    /// Sets the reply mode.
    #[must_use]
    pub fn with_reply_mode(mut self, mode: ReplyMode) -> Self {
        self.reply_mode = mode;
        self
    }

    /// Sets the data file, or keeps records in memory only with `None`.
    #[must_use]
    pub fn with_data_file(mut self, path: Option<PathBuf>) -> Self {
        self.data_file = path;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], 9000)))
    }
}
