//! Shared building blocks for the prober and the status server.

pub mod error;
pub mod logging;
pub mod model;
pub mod settings;
pub mod signal;
pub mod store;
pub mod version;

pub use error::{SettingsError, StoreError};
pub use model::{RecentStatus, StatusRecord};
pub use settings::{Settings, StoreSettings};
pub use store::{MemoryStatusStore, PgStatusStore, StatusStore};
