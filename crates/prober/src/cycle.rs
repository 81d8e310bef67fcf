//! One full pass over the configured targets: dispatch, record, wait.
use serverstat_common::{MemoryStatusStore, PgStatusStore, Settings, StatusStore};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::error::ProberError;
use crate::probe::Prober;
use crate::recorder::Recorder;

/// Where a cycle writes its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Postgres,
    /// Results are kept in memory for the duration of the cycle and only logged.
    Memory,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub targets: usize,
    pub received: usize,
    pub persisted: usize,
    pub failed: usize,
}

impl CycleReport {
    pub fn is_complete(&self) -> bool {
        self.persisted == self.targets
    }
}

/// Probes every target in parallel and returns after the last persistence
/// task has finished.
pub async fn run_cycle(targets: &[String], prober: &Prober, recorder: &Recorder) -> CycleReport {
    if targets.is_empty() {
        info!("No targets configured; nothing to probe.");
        return CycleReport::default();
    }

    let (tx, rx) = mpsc::channel(targets.len());
    prober.dispatch(targets, tx);
    recorder.record(rx, targets.len()).await
}

/// Runs one cycle against an already opened store.
pub async fn run_with_store(
    settings: &Settings,
    store: Arc<dyn StatusStore>,
) -> Result<CycleReport, ProberError> {
    let prober = Prober::new(settings.http_timeout)?;
    let recorder = Recorder::new(store);
    Ok(run_cycle(&settings.servers, &prober, &recorder).await)
}

/// Reads the settings file, opens the store, runs one cycle and closes the
/// store again. Settings are never cached between calls.
pub async fn run_from_config(path: &Path, mode: StoreMode) -> Result<CycleReport, ProberError> {
    let settings = Settings::load(path)?;

    let store: Arc<dyn StatusStore> = match mode {
        StoreMode::Postgres => Arc::new(PgStatusStore::connect(&settings.store).await?),
        StoreMode::Memory => Arc::new(MemoryStatusStore::new()),
    };

    let result = run_with_store(&settings, Arc::clone(&store)).await;
    store.close().await;
    let report = result?;

    info!(
        targets = report.targets,
        persisted = report.persisted,
        failed = report.failed,
        "Completed"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(servers: Vec<String>) -> Settings {
        let yaml = format!(
            "host: localhost\nport: 5432\ndatabase: status\nuser: u\npass: p\nhttptimeout_ms: 2000\nservers: {}\n",
            yaml_list(&servers)
        );
        Settings::from_yaml(&yaml).unwrap()
    }

    fn yaml_list(servers: &[String]) -> String {
        let quoted: Vec<String> = servers.iter().map(|s| format!("\"{s}\"")).collect();
        format!("[{}]", quoted.join(", "))
    }

    #[tokio::test]
    async fn test_cycle_persists_one_row_per_target() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let targets = vec![
            format!("{}/a", server.uri()),
            format!("{}/b", server.uri()),
            format!("{}/c", server.uri()),
            "http://127.0.0.1:1".to_string(),
        ];
        let store = Arc::new(MemoryStatusStore::new());

        let report = run_with_store(&settings_for(targets.clone()), store.clone())
            .await
            .unwrap();

        assert_eq!(report.targets, 4);
        assert_eq!(report.persisted, 4);
        assert!(report.is_complete());

        let rows = store.rows();
        assert_eq!(rows.len(), 4);
        for target in &targets {
            assert_eq!(rows.iter().filter(|r| &r.record.url == target).count(), 1);
        }
        let unreachable = rows
            .iter()
            .find(|r| r.record.url == "http://127.0.0.1:1")
            .unwrap();
        assert!(!unreachable.record.available);
        assert_eq!(rows.iter().filter(|r| r.record.available).count(), 3);
    }

    #[tokio::test]
    async fn test_unreachable_host_still_recorded() {
        let store = Arc::new(MemoryStatusStore::new());
        let settings = settings_for(vec!["https://bad.invalid:9999".to_string()]);

        let report = run_with_store(&settings, store.clone()).await.unwrap();

        assert_eq!(report.persisted, 1);
        let rows = store.rows();
        assert_eq!(rows[0].record.url, "https://bad.invalid:9999");
        assert!(!rows[0].record.available);
    }

    #[tokio::test]
    async fn test_empty_target_list_completes_immediately() {
        let store = Arc::new(MemoryStatusStore::new());

        let report = tokio::time::timeout(
            Duration::from_millis(500),
            run_with_store(&settings_for(Vec::new()), store.clone()),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(report, CycleReport::default());
        assert!(report.is_complete());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_missing_pass_aborts_before_any_probe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "host: localhost\nport: 5432\ndatabase: status\nuser: u\nhttptimeout_ms: 2000\nservers: [\"{}\"]\n",
            server.uri()
        )
        .unwrap();

        let err = run_from_config(file.path(), StoreMode::Memory).await.unwrap_err();

        assert!(matches!(
            err,
            ProberError::Settings(serverstat_common::SettingsError::Missing("pass"))
        ));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_from_config_in_memory_mode() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "host: localhost\nport: 5432\ndatabase: status\nuser: u\npass: p\nhttptimeout_ms: 2000\nservers: [\"{0}/x\", \"{0}/y\"]\n",
            server.uri()
        )
        .unwrap();

        let report = run_from_config(file.path(), StoreMode::Memory).await.unwrap();

        assert_eq!(report.persisted, 2);
        assert_eq!(report.failed, 0);
    }
}
