use serde::Deserialize;
use sqlx::postgres::PgSslMode;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::SettingsError;

const ENV_PREFIX: &str = "SERVERSTAT_";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Connection parameters shared by the prober and the status server.
#[derive(Clone)]
pub struct StoreSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub pass: String,
    pub max_connections: u32,
    pub ssl_mode: PgSslMode,
    /// Create the `servers` table and its index on connect. Needs CREATE on the schema.
    pub init_schema: bool,
}

impl fmt::Debug for StoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("ssl_mode", &self.ssl_mode)
            .field("init_schema", &self.init_schema)
            .finish()
    }
}

/// Everything one probe cycle needs. Re-read from disk at the start of every cycle.
#[derive(Debug, Clone)]
pub struct Settings {
    pub store: StoreSettings,
    pub http_timeout: Duration,
    pub servers: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u64),
    Text(String),
}

// Raw file contents before the required keys are checked.
#[derive(Deserialize, Default)]
struct PartialSettings {
    host: Option<String>,
    port: Option<PortValue>,
    database: Option<String>,
    user: Option<String>,
    pass: Option<String>,
    httptimeout_ms: Option<u64>,
    servers: Option<Vec<String>>,
    max_connections: Option<u32>,
    sslmode: Option<String>,
    init_schema: Option<bool>,
}

impl PartialSettings {
    fn read(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    fn parse(contents: &str) -> Result<Self, SettingsError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Values found through `lookup` replace the ones from the file.
    fn overlay<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(&format!("{ENV_PREFIX}{key}"));
        if let Some(host) = var("HOST") {
            self.host = Some(host);
        }
        if let Some(port) = var("PORT") {
            self.port = Some(PortValue::Text(port));
        }
        if let Some(database) = var("DATABASE") {
            self.database = Some(database);
        }
        if let Some(user) = var("USER") {
            self.user = Some(user);
        }
        if let Some(pass) = var("PASS") {
            self.pass = Some(pass);
        }
        self
    }

    fn store_settings(&mut self) -> Result<StoreSettings, SettingsError> {
        let host = self.host.take().ok_or(SettingsError::Missing("host"))?;
        let port = parse_port(self.port.take().ok_or(SettingsError::Missing("port"))?)?;
        let database = self
            .database
            .take()
            .ok_or(SettingsError::Missing("database"))?;
        let user = self.user.take().ok_or(SettingsError::Missing("user"))?;
        let pass = self.pass.take().ok_or(SettingsError::Missing("pass"))?;

        let max_connections = self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS);
        if max_connections == 0 {
            return Err(SettingsError::Invalid {
                key: "max_connections",
                reason: "must be at least 1".to_string(),
            });
        }

        let ssl_mode = match self.sslmode.take() {
            Some(mode) => PgSslMode::from_str(&mode).map_err(|e| SettingsError::Invalid {
                key: "sslmode",
                reason: e.to_string(),
            })?,
            None => PgSslMode::Disable,
        };

        Ok(StoreSettings {
            host,
            port,
            database,
            user,
            pass,
            max_connections,
            ssl_mode,
            init_schema: self.init_schema.unwrap_or(false),
        })
    }

    fn into_settings(mut self) -> Result<Settings, SettingsError> {
        let store = self.store_settings()?;
        let timeout_ms = self
            .httptimeout_ms
            .ok_or(SettingsError::Missing("httptimeout_ms"))?;
        if timeout_ms == 0 {
            return Err(SettingsError::Invalid {
                key: "httptimeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        let servers = self.servers.ok_or(SettingsError::Missing("servers"))?;

        Ok(Settings {
            store,
            http_timeout: Duration::from_millis(timeout_ms),
            servers,
        })
    }
}

fn parse_port(value: PortValue) -> Result<u16, SettingsError> {
    let invalid = |reason: String| SettingsError::Invalid {
        key: "port",
        reason,
    };
    match value {
        PortValue::Number(n) => u16::try_from(n).map_err(|_| invalid(format!("{n} is out of range"))),
        PortValue::Text(s) => s
            .trim()
            .parse::<u16>()
            .map_err(|e| invalid(format!("'{s}': {e}"))),
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

impl Settings {
    /// Loads the settings file, applying `SERVERSTAT_*` environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        dotenv::dotenv().ok();
        let path = path.as_ref();
        let settings = PartialSettings::read(path)?
            .overlay(env_lookup)
            .into_settings()?;
        info!(
            path = ?path,
            targets = settings.servers.len(),
            timeout_ms = settings.http_timeout.as_millis() as u64,
            "Loaded settings."
        );
        Ok(settings)
    }

    /// Parses settings from YAML text without consulting the environment.
    pub fn from_yaml(contents: &str) -> Result<Self, SettingsError> {
        PartialSettings::parse(contents)?.into_settings()
    }
}

impl StoreSettings {
    /// Loads only the connection keys; prober-specific keys may be absent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        dotenv::dotenv().ok();
        PartialSettings::read(path.as_ref())?
            .overlay(env_lookup)
            .store_settings()
    }

    pub fn from_yaml(contents: &str) -> Result<Self, SettingsError> {
        PartialSettings::parse(contents)?.store_settings()
    }
}
