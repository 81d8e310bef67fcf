use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single probe, waiting to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRecord {
    pub url: String,
    pub available: bool,
    /// Taken when the request was issued.
    pub observed_at: DateTime<Utc>,
}

/// A persisted row as served by the refresh endpoint. `available` and `time`
/// keep the store's own text rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "PascalCase")]
pub struct RecentStatus {
    pub available: String,
    pub url: String,
    pub time: String,
}
