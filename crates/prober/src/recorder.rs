//! Status Recorder: drains the probe channel and persists each record.
use serverstat_common::{StatusRecord, StatusStore};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::cycle::CycleReport;

pub struct Recorder {
    store: Arc<dyn StatusStore>,
    permits: Arc<Semaphore>,
}

impl Recorder {
    /// Write concurrency follows the store's connection limit.
    pub fn new(store: Arc<dyn StatusStore>) -> Self {
        let limit = store.max_connections();
        Self::with_limit(store, limit)
    }

    pub fn with_limit(store: Arc<dyn StatusStore>, limit: usize) -> Self {
        Self {
            store,
            permits: Arc::new(Semaphore::new(limit.max(1))),
        }
    }

    /// Receives up to `expected` records, spawning one persistence task for
    /// each, and returns once every spawned task has finished. A failed insert
    /// is logged and counted; it does not affect the other records.
    pub async fn record(
        &self,
        mut rx: mpsc::Receiver<StatusRecord>,
        expected: usize,
    ) -> CycleReport {
        let mut tasks = JoinSet::new();
        let mut received = 0;

        while received < expected {
            let Some(record) = rx.recv().await else {
                warn!(
                    expected,
                    received, "Status channel closed before every probe reported."
                );
                break;
            };
            received += 1;

            let store = Arc::clone(&self.store);
            let permits = Arc::clone(&self.permits);
            tasks.spawn(async move {
                // The semaphore is never closed.
                let _permit = permits.acquire_owned().await;
                match store.insert_status(&record).await {
                    Ok(id) => {
                        info!(
                            id,
                            url = %record.url,
                            available = record.available,
                            "Status recorded."
                        );
                        true
                    }
                    Err(e) => {
                        error!(url = %record.url, error = %e, "Failed to persist status.");
                        false
                    }
                }
            });
        }

        let mut report = CycleReport {
            targets: expected,
            received,
            ..CycleReport::default()
        };
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => report.persisted += 1,
                Ok(false) => report.failed += 1,
                Err(e) => {
                    error!(error = %e, "Persistence task panicked.");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use serverstat_common::{MemoryStatusStore, RecentStatus, StoreError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn record(url: &str) -> StatusRecord {
        StatusRecord {
            url: url.to_string(),
            available: true,
            observed_at: Utc::now(),
        }
    }

    /// Rejects inserts for URLs containing "fail" and tracks write overlap.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStatusStore,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl StatusStore for FlakyStore {
        async fn insert_status(&self, record: &StatusRecord) -> Result<i64, StoreError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if record.url.contains("fail") {
                return Err(StoreError::Unavailable("insert rejected".to_string()));
            }
            self.inner.insert_status(record).await
        }

        async fn recent_statuses(&self, window: Duration) -> Result<Vec<RecentStatus>, StoreError> {
            self.inner.recent_statuses(window).await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }

        fn max_connections(&self) -> usize {
            2
        }
    }

    #[tokio::test]
    async fn test_every_received_record_is_persisted_before_return() {
        let store = Arc::new(MemoryStatusStore::new());
        let recorder = Recorder::new(store.clone());
        let (tx, rx) = mpsc::channel(5);
        for i in 0..5 {
            tx.send(record(&format!("https://host-{i}"))).await.unwrap();
        }

        let report = recorder.record(rx, 5).await;

        assert_eq!(report.persisted, 5);
        assert_eq!(report.failed, 0);
        assert_eq!(store.len(), 5);
    }

    #[tokio::test]
    async fn test_failed_insert_does_not_stop_others() {
        let store = Arc::new(FlakyStore::default());
        let recorder = Recorder::new(store.clone());
        let (tx, rx) = mpsc::channel(3);
        tx.send(record("https://ok-1")).await.unwrap();
        tx.send(record("https://fail")).await.unwrap();
        tx.send(record("https://ok-2")).await.unwrap();

        let report = recorder.record(rx, 3).await;

        assert_eq!(report.received, 3);
        assert_eq!(report.persisted, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(store.inner.len(), 2);
    }

    #[tokio::test]
    async fn test_writes_bounded_by_store_connections() {
        let store = Arc::new(FlakyStore::default());
        let recorder = Recorder::new(store.clone());
        let (tx, rx) = mpsc::channel(8);
        for i in 0..8 {
            tx.send(record(&format!("https://host-{i}"))).await.unwrap();
        }

        let report = recorder.record(rx, 8).await;

        assert_eq!(report.persisted, 8);
        assert!(store.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_closed_channel_ends_recording_early() {
        let store = Arc::new(MemoryStatusStore::new());
        let recorder = Recorder::new(store.clone());
        let (tx, rx) = mpsc::channel(3);
        tx.send(record("https://only")).await.unwrap();
        drop(tx);

        let report = recorder.record(rx, 3).await;

        assert_eq!(report.targets, 3);
        assert_eq!(report.received, 1);
        assert_eq!(report.persisted, 1);
        assert_eq!(store.len(), 1);
    }
}
