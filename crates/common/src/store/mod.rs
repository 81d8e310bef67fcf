//! Persistence seam for status records.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::StoreError;
use crate::model::{RecentStatus, StatusRecord};

mod memory;
mod postgres;

pub use memory::{MemoryStatusStore, StoredStatus};
pub use postgres::PgStatusStore;

#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Appends one row and returns its generated identifier.
    async fn insert_status(&self, record: &StatusRecord) -> Result<i64, StoreError>;

    /// Rows observed strictly less than `window` ago, in no particular order.
    async fn recent_statuses(&self, window: Duration) -> Result<Vec<RecentStatus>, StoreError>;

    /// Lightweight connectivity check.
    async fn ping(&self) -> Result<(), StoreError>;

    /// How many writes the store can usefully take at once.
    fn max_connections(&self) -> usize;

    async fn close(&self) {}
}
