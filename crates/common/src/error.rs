use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse settings YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Failed to read '{0}' from config")]
    Missing(&'static str),
    #[error("Invalid value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Connection error or '{database}' database doesn't exist: {source}")]
    Connect {
        database: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("Database error: {0}")]
    Query(#[from] sqlx::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
