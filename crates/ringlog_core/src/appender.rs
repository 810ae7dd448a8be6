//! Periodic timestamp records.

use crate::error::CoreResult;
use crate::shutdown::Shutdown;
use crate::store::RecordStore;
use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// `strftime` pattern of a timestamp record, terminator included.
pub const TIMESTAMP_FORMAT: &str = "timestamp:%a, %d %b %Y %H:%M:%S %z\n";

/// Formats `at` as a timestamp record.
pub fn format_timestamp<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Commits a timestamp record to a store on a fixed period.
///
/// The first record is written as soon as the task starts. Timestamp
/// records go through the same lock and the same eviction as client
/// records, so a busy clock can push out older client history.
///
/// The task stops when shutdown triggers. A failed tick is logged and the
/// next tick tries again.
pub struct TimestampAppender {
    store: Arc<RecordStore>,
    period: Duration,
    shutdown: Shutdown,
}

impl TimestampAppender {
    /// Creates an appender for `store`, observing the store's shutdown flag.
    pub fn new(store: Arc<RecordStore>, period: Duration) -> Self {
        let shutdown = store.shutdown().clone();
        Self {
            store,
            period,
            shutdown,
        }
    }

    /// Runs the appender on the current runtime.
    ///
    /// The handle resolves to the number of records appended.
    pub fn spawn(self) -> JoinHandle<u64> {
        tokio::spawn(self.run())
    }

    /// Runs until shutdown, returning the number of records appended.
    pub async fn run(self) -> u64 {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut appended = 0u64;

        info!("Timestamp appender started (period: {:?})", self.period);
        loop {
            tokio::select! {
                biased;
                () = self.shutdown.wait() => break,
                _ = ticker.tick() => {}
            }

            match self.append_now().await {
                Ok(()) => appended += 1,
                Err(e) if e.is_terminal() => break,
                // Not reachable today: the line always ends with the
                // delimiter and persist failures do not surface here.
                Err(e) => warn!("Timestamp tick failed, retrying next period: {}", e),
            }
        }
        info!("Timestamp appender stopped after {} records", appended);
        appended
    }

    async fn append_now(&self) -> CoreResult<()> {
        let line = format_timestamp(&Local::now());
        debug!("Appending {}", line.trim_end());
        let evicted = self.store.append_system_record(line.as_bytes()).await?;
        drop(evicted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(
            format_timestamp(&at),
            "timestamp:Tue, 05 Mar 2024 07:08:09 +0000\n"
        );

        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let at = offset.with_ymd_and_hms(2024, 12, 31, 23, 0, 0).unwrap();
        assert_eq!(
            format_timestamp(&at),
            "timestamp:Tue, 31 Dec 2024 23:00:00 +0200\n"
        );
    }

    #[tokio::test]
    async fn appends_until_shutdown() {
        let shutdown = Shutdown::new();
        let config = StoreConfig::new().capacity(4);
        let store = Arc::new(RecordStore::in_memory(config, shutdown.clone()).unwrap());

        let handle = TimestampAppender::new(Arc::clone(&store), Duration::from_millis(10)).spawn();
        tokio::time::sleep(Duration::from_millis(60)).await;
        shutdown.trigger();

        let appended = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(appended >= 2);

        let stats = store.stats().await.unwrap();
        assert!(stats.records <= 4);
        assert_eq!(stats.commits, appended);
        for record in store.snapshot().await.unwrap() {
            assert!(record.starts_with(b"timestamp:"));
            assert!(record.ends_with(b"\n"));
        }
    }

    #[tokio::test]
    async fn stops_immediately_when_already_shut_down() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let store = Arc::new(RecordStore::in_memory(StoreConfig::default(), shutdown).unwrap());

        let appended = TimestampAppender::new(Arc::clone(&store), Duration::from_secs(3600))
            .run()
            .await;
        assert_eq!(appended, 0);
    }

    #[tokio::test]
    async fn stops_when_store_is_closed() {
        let store =
            Arc::new(RecordStore::in_memory(StoreConfig::default(), Shutdown::new()).unwrap());
        store.teardown().await.unwrap();

        let appended = tokio::time::timeout(
            Duration::from_secs(1),
            TimestampAppender::new(store, Duration::from_millis(5)).run(),
        )
        .await
        .unwrap();
        assert_eq!(appended, 0);
    }
}
