use axum::{
    extract::{Query, State},
    http::Method,
    response::Html,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serverstat_common::RecentStatus;
use std::path::Path;
use std::sync::Arc;
use tera::Context;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::{AppError, AppState, REFRESH_WINDOW};

const DEFAULT_PAGE_NAME: &str = "Gopher";

pub fn create_router(app_state: Arc<AppState>, assets_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route(
            "/refresh",
            get(refresh_handler)
                .head(refresh_method_not_allowed)
                .fallback(refresh_method_not_allowed),
        )
        .nest_service("/assets", ServeDir::new(assets_dir.as_ref()))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}

#[derive(Deserialize)]
struct IndexQuery {
    name: Option<String>,
}

async fn index_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<IndexQuery>,
) -> Result<Html<String>, AppError> {
    debug!("Serving /...");
    let name = query
        .name
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_PAGE_NAME.to_string());

    let db_status = match app_state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Database ping failed.");
            false
        }
    };

    let mut context = Context::new();
    context.insert("name", &name);
    context.insert("db_status", &db_status);
    let page = app_state.templates.render("index.html", &context)?;
    Ok(Html(page))
}

async fn refresh_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<RecentStatus>>, AppError> {
    debug!("Serving refresh...");
    let statuses = app_state.store.recent_statuses(REFRESH_WINDOW).await?;
    Ok(Json(statuses))
}

async fn refresh_method_not_allowed(method: Method) -> AppError {
    warn!(%method, "Rejected refresh request.");
    AppError::MethodNotAllowed
}
