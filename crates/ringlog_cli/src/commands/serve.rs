//! Serve command implementation.

use ringlog_core::{Shutdown, StoreConfig};
use ringlog_server::{RecordServer, ReplyMode, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

/// Options for the serve command.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Address to listen on.
    pub bind: SocketAddr,
    /// Number of records kept.
    pub capacity: usize,
    /// Data file, or `None` for memory only.
    pub data_file: Option<PathBuf>,
    /// Leave the data file in place on exit.
    pub keep_data_file: bool,
    /// Seconds between timestamp records; 0 disables them.
    pub timestamp_interval: u64,
    /// Reply after every committed record.
    pub reply_on_commit: bool,
    /// Maximum concurrent sessions.
    pub max_sessions: usize,
}

impl ServeOptions {
    fn server_config(&self) -> ServerConfig {
        let store = StoreConfig::new()
            .capacity(self.capacity)
            .destroy_backend_on_teardown(!self.keep_data_file);
        let timestamps =
            (self.timestamp_interval > 0).then(|| Duration::from_secs(self.timestamp_interval));
        let reply_mode = if self.reply_on_commit {
            ReplyMode::OnCommit
        } else {
            ReplyMode::OnEndOfInput
        };

        ServerConfig::new(self.bind)
            .with_store(store)
            .with_max_sessions(self.max_sessions)
            .with_timestamp_interval(timestamps)
            .with_reply_mode(reply_mode)
            .with_data_file(self.data_file.clone())
    }
}

/// Runs the serve command until SIGINT or SIGTERM.
pub async fn run(options: ServeOptions) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = Shutdown::new();
    let server = RecordServer::open(options.server_config(), shutdown.clone())?;
    let bound = server.bind().await?;

    tokio::spawn(wait_for_signal(shutdown));

    let summary = bound.run().await?;
    info!(
        "Served {} sessions ({} failed, {} rejected), {} timestamps",
        summary.sessions_completed,
        summary.sessions_failed,
        summary.connections_rejected,
        summary.timestamps_appended
    );
    Ok(())
}

async fn wait_for_signal(shutdown: Shutdown) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
    shutdown.trigger();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ServeOptions {
        ServeOptions {
            bind: "127.0.0.1:9000".parse().unwrap(),
            capacity: 5,
            data_file: None,
            keep_data_file: false,
            timestamp_interval: 10,
            reply_on_commit: false,
            max_sessions: 4,
        }
    }

    #[test]
    fn options_map_to_config() {
        let config = options().server_config();
        assert_eq!(config.store.capacity, 5);
        assert!(config.store.destroy_backend_on_teardown);
        assert_eq!(config.timestamp_interval, Some(Duration::from_secs(10)));
        assert_eq!(config.reply_mode, ReplyMode::OnEndOfInput);
        assert_eq!(config.max_sessions, 4);
        assert!(config.data_file.is_none());
    }

    #[test]
    fn zero_interval_disables_timestamps() {
        let mut opts = options();
        opts.timestamp_interval = 0;
        opts.keep_data_file = true;
        opts.reply_on_commit = true;
        let config = opts.server_config();
        assert!(config.timestamp_interval.is_none());
        assert!(!config.store.destroy_backend_on_teardown);
        assert_eq!(config.reply_mode, ReplyMode::OnCommit);
    }
}
