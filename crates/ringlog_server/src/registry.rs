//! Tracking of running sessions.

use crate::session::SessionReport;
use std::future::Future;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error};

/// The set of session tasks the server has spawned.
///
/// Finished sessions are reaped periodically so the set does not grow with
/// every connection ever accepted; at shutdown the remaining sessions are
/// drained.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: JoinSet<SessionReport>,
    completed: u64,
    failed: u64,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a session task.
    pub fn spawn<F>(&mut self, session: F)
    where
        F: Future<Output = SessionReport> + Send + 'static,
    {
        self.sessions.spawn(session);
    }

    /// Sessions spawned and not yet reaped.
    pub fn active(&self) -> usize {
        self.sessions.len()
    }

    /// Sessions that ran to completion.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Sessions that ended with an error or panicked.
    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Collects sessions that have already finished, without waiting.
    ///
    /// Returns the number reaped.
    pub fn reap(&mut self) -> usize {
        let mut reaped = 0;
        while let Some(result) = self.sessions.try_join_next() {
            self.record(result);
            reaped += 1;
        }
        if reaped > 0 {
            debug!("Reaped {} finished sessions, {} active", reaped, self.active());
        }
        reaped
    }

    /// Waits for every remaining session to finish.
    ///
    /// Returns the number drained.
    pub async fn drain(&mut self) -> usize {
        let mut drained = 0;
        while let Some(result) = self.sessions.join_next().await {
            self.record(result);
            drained += 1;
        }
        drained
    }

    fn record(&mut self, result: Result<SessionReport, JoinError>) {
        match result {
            Ok(report) if report.is_success() => self.completed += 1,
            Ok(_) => self.failed += 1,
            Err(e) => {
                error!("Session task failed: {}", e);
                self.failed += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use std::io;
    use tokio::sync::oneshot;

    fn report(error: Option<ServerError>) -> SessionReport {
        SessionReport {
            peer: "test".to_string(),
            records_committed: 0,
            bytes_received: 0,
            bytes_sent: 0,
            discarded: 0,
            error,
        }
    }

    #[tokio::test]
    async fn drain_counts_outcomes() {
        let mut registry = SessionRegistry::new();
        registry.spawn(async { report(None) });
        registry.spawn(async { report(None) });
        registry.spawn(async {
            report(Some(ServerError::Transport(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "reset",
            ))))
        });
        assert_eq!(registry.active(), 3);

        assert_eq!(registry.drain().await, 3);
        assert_eq!(registry.active(), 0);
        assert_eq!(registry.completed(), 2);
        assert_eq!(registry.failed(), 1);
    }

    #[tokio::test]
    async fn reap_leaves_running_sessions() {
        let mut registry = SessionRegistry::new();
        let (tx, rx) = oneshot::channel::<()>();
        registry.spawn(async move {
            let _ = rx.await;
            report(None)
        });
        registry.spawn(async { report(None) });

        // Let the ready session finish.
        while registry.completed() == 0 {
            tokio::task::yield_now().await;
            registry.reap();
        }
        assert_eq!(registry.active(), 1);

        tx.send(()).unwrap();
        assert_eq!(registry.drain().await, 1);
        assert_eq!(registry.completed(), 2);
    }

    #[tokio::test]
    async fn panicked_session_counts_as_failed() {
        let mut registry = SessionRegistry::new();
        registry.spawn(async {
            if true {
                panic!("boom");
            }
            report(None)
        });
        registry.drain().await;
        assert_eq!(registry.failed(), 1);
    }
}
