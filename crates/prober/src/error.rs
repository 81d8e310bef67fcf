use serverstat_common::{SettingsError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProberError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
