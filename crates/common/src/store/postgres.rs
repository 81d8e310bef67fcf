use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{error, info};

use super::StatusStore;
use crate::error::StoreError;
use crate::model::{RecentStatus, StatusRecord};
use crate::settings::StoreSettings;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// `servers` table backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStatusStore {
    pool: PgPool,
    max_connections: u32,
}

impl PgStatusStore {
    /// Opens the pool and pings it. The `servers` table is only created when
    /// `init_schema` is set; otherwise it must already exist.
    pub async fn connect(settings: &StoreSettings) -> Result<Self, StoreError> {
        let options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .database(&settings.database)
            .username(&settings.user)
            .password(&settings.pass)
            .ssl_mode(settings.ssl_mode)
            .options([("TimeZone", "UTC")]);

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|source| {
                error!(
                    host = %settings.host,
                    port = settings.port,
                    database = %settings.database,
                    error = %source,
                    "Connection error or database doesn't exist."
                );
                StoreError::Connect {
                    database: settings.database.clone(),
                    source,
                }
            })?;

        let store = Self::from_pool(pool, settings.max_connections);
        store.ping().await?;
        info!(database = %settings.database, "Connection Ping OK.");
        if settings.init_schema {
            store.ensure_schema().await?;
            info!("Schema ready.");
        }
        Ok(store)
    }

    pub fn from_pool(pool: PgPool, max_connections: u32) -> Self {
        Self {
            pool,
            max_connections,
        }
    }

    /// Needs CREATE on the current schema even when the table already exists.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS servers (
                id BIGSERIAL PRIMARY KEY,
                url TEXT NOT NULL,
                available BOOLEAN NOT NULL,
                time TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS servers_time_idx ON servers (time)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl StatusStore for PgStatusStore {
    async fn insert_status(&self, record: &StatusRecord) -> Result<i64, StoreError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO servers (url, available, time) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&record.url)
        .bind(record.available)
        .bind(record.observed_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn recent_statuses(&self, window: Duration) -> Result<Vec<RecentStatus>, StoreError> {
        let rows = sqlx::query_as::<_, RecentStatus>(
            r#"
            SELECT url, available::text AS available, time::text AS time
            FROM servers
            WHERE now() - time < make_interval(secs => $1)
            "#,
        )
        .bind(window.as_secs_f64())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn max_connections(&self) -> usize {
        self.max_connections as usize
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
