use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::StatusStore;
use crate::error::StoreError;
use crate::model::{RecentStatus, StatusRecord};

const MEMORY_WRITE_CONCURRENCY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredStatus {
    pub id: i64,
    pub record: StatusRecord,
}

/// Process-local store used for dry runs and tests.
#[derive(Default)]
pub struct MemoryStatusStore {
    rows: Mutex<Vec<StoredStatus>>,
    next_id: AtomicI64,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<StoredStatus> {
        self.rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn insert_status(&self, record: &StatusRecord) -> Result<i64, StoreError> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        rows.push(StoredStatus {
            id,
            record: record.clone(),
        });
        Ok(id)
    }

    async fn recent_statuses(&self, window: Duration) -> Result<Vec<RecentStatus>, StoreError> {
        let window = chrono::Duration::from_std(window)
            .map_err(|e| StoreError::Unavailable(format!("window out of range: {e}")))?;
        let now = Utc::now();
        let rows = self
            .rows
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(rows
            .iter()
            .filter(|row| now - row.record.observed_at < window)
            .map(|row| RecentStatus {
                available: row.record.available.to_string(),
                url: row.record.url.clone(),
                time: row
                    .record
                    .observed_at
                    .format("%Y-%m-%d %H:%M:%S%.6f+00")
                    .to_string(),
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn max_connections(&self) -> usize {
        MEMORY_WRITE_CONCURRENCY
    }
}
