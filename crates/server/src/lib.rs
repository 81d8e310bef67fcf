//! Status Server: a small web view over recently recorded probe results.

pub mod error;
pub mod routes;
pub mod templates;

use serverstat_common::StatusStore;
use std::sync::Arc;
use std::time::Duration;
use tera::Tera;

pub use error::AppError;
pub use routes::create_router;

/// Rows younger than this are served by `/refresh`.
pub const REFRESH_WINDOW: Duration = Duration::from_secs(5 * 60);

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StatusStore>,
    pub templates: Arc<Tera>,
}
