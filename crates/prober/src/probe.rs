//! Probe Dispatcher: one GET per target, one [`StatusRecord`] per probe.
use chrono::Utc;
use serverstat_common::version::user_agent;
use serverstat_common::StatusRecord;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Prefixes `https://` unless the target already names an http(s) scheme.
pub fn normalize_target(target: &str) -> String {
    let trimmed = target.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Issues availability checks. Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct Prober {
    client: reqwest::Client,
}

impl Prober {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent())
            .build()?;
        Ok(Self { client })
    }

    /// Never fails: transport errors and timeouts come back as unavailable.
    pub async fn probe(&self, target: &str) -> StatusRecord {
        let url = normalize_target(target);
        debug!(url = %url, "Check status.");

        let observed_at = Utc::now();
        let available = match self.client.get(&url).send().await {
            Ok(response) => {
                let status = response.status();
                debug!(url = %url, status = status.as_u16(), "Probe response received.");
                status.as_u16() < 400
            }
            Err(e) => {
                let reason = if e.is_timeout() {
                    "request timed out"
                } else if e.is_connect() {
                    "connection failed"
                } else {
                    "request failed"
                };
                warn!(url = %url, error = %e, reason, "Probe failed.");
                false
            }
        };

        StatusRecord {
            url,
            available,
            observed_at,
        }
    }

    /// Spawns one unthrottled probe task per target. Each task sends exactly
    /// one record on `tx`; the sender is dropped once every task has finished.
    pub fn dispatch(&self, targets: &[String], tx: mpsc::Sender<StatusRecord>) {
        for target in targets {
            info!(server = %target, "Run probe.");
            let prober = self.clone();
            let target = target.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let record = prober.probe(&target).await;
                if let Err(e) = tx.send(record).await {
                    error!(server = %target, error = %e, "Recorder is gone; dropping status.");
                }
            });
        }
    }
}
