//! PostgreSQL backend.
//!
//! Ordinary statements go through a lazily connected pool. Create/drop
//! database need autocommit, so they run on a dedicated connection opened for
//! the call and closed afterwards.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Timelike};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, Executor, PgConnection, PgPool};

use common::config::AppConfig;
use common::errors::{AppError, AppResult};
use common::models::TestRecord;

use crate::service::{CreateOutcome, DatabaseBackend};

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS test_connection (
    id SERIAL PRIMARY KEY,
    message TEXT NOT NULL,
    created_at TIMESTAMP DEFAULT NOW()
)";

/// Row from the `test_connection` table.
#[derive(sqlx::FromRow)]
struct RecordRow {
    id: i32,
    message: String,
    created_at: Option<NaiveDateTime>,
}

impl RecordRow {
    fn into_record(self) -> TestRecord {
        TestRecord {
            id: self.id,
            message: self.message,
            created_at: self.created_at.map(format_timestamp),
        }
    }
}

/// Renders `YYYY-MM-DD HH:MM:SS`, with six fractional digits when non-zero.
fn format_timestamp(t: NaiveDateTime) -> String {
    let mut text = t.format("%Y-%m-%d %H:%M:%S").to_string();
    if t.nanosecond() != 0 {
        text.push_str(&t.format("%.6f").to_string());
    }
    text
}

/// PostgreSQL implementation of [`DatabaseBackend`].
pub struct PgBackend {
    pool: PgPool,
    admin_options: PgConnectOptions,
    connect_timeout: Duration,
}

impl PgBackend {
    /// Builds the pool without connecting; the first request opens a connection.
    pub fn connect_lazy(config: &AppConfig) -> AppResult<Self> {
        let options = PgConnectOptions::from_str(&config.database_url)
            .map_err(|e| AppError::Config(format!("DATABASE_URL: {}", e)))?;
        let connect_timeout = Duration::from_secs(config.connect_timeout_secs);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(connect_timeout)
            .test_before_acquire(true)
            .connect_lazy_with(options.clone());

        Ok(Self {
            pool,
            admin_options: options,
            connect_timeout,
        })
    }

    /// Opens a standalone autocommit connection outside the pool.
    async fn admin_connection(&self) -> AppResult<PgConnection> {
        match tokio::time::timeout(
            self.connect_timeout,
            PgConnection::connect_with(&self.admin_options),
        )
        .await
        {
            Ok(conn) => conn.map_err(query_error),
            Err(_) => Err(AppError::DatabaseQuery(format!(
                "timed out after {}s",
                self.connect_timeout.as_secs()
            ))),
        }
    }

    /// Closes an admin connection, logging rather than failing on error.
    async fn close_admin(conn: PgConnection) {
        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "failed to close admin connection");
        }
    }
}

fn query_error(e: sqlx::Error) -> AppError {
    AppError::DatabaseQuery(e.to_string())
}

async fn create_database_on(conn: &mut PgConnection, name: &str) -> AppResult<CreateOutcome> {
    let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM pg_database WHERE datname = $1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await
        .map_err(query_error)?;
    if exists.is_some() {
        return Ok(CreateOutcome::AlreadyExists);
    }

    let statement = format!("CREATE DATABASE {}", quote_identifier(name));
    conn.execute(statement.as_str())
        .await
        .map_err(query_error)?;
    Ok(CreateOutcome::Created)
}

/// Quotes `name` as a PostgreSQL identifier.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[async_trait]
impl DatabaseBackend for PgBackend {
    async fn version(&self) -> AppResult<String> {
        sqlx::query_scalar::<_, String>("SELECT version()")
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)
    }

    async fn create_table(&self) -> AppResult<()> {
        sqlx::query(CREATE_TABLE_SQL)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn insert(&self, message: &str) -> AppResult<TestRecord> {
        let row = sqlx::query_as::<_, RecordRow>(
            "INSERT INTO test_connection (message) VALUES ($1) RETURNING id, message, created_at",
        )
        .bind(message)
        .fetch_one(&self.pool)
        .await
        .map_err(query_error)?;
        Ok(row.into_record())
    }

    async fn recent(&self, limit: i64) -> AppResult<Vec<TestRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(
            "SELECT id, message, created_at FROM test_connection ORDER BY id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;
        Ok(rows.into_iter().map(RecordRow::into_record).collect())
    }

    async fn create_database(&self, name: &str) -> AppResult<CreateOutcome> {
        let mut conn = self.admin_connection().await?;
        let result = create_database_on(&mut conn, name).await;
        Self::close_admin(conn).await;
        result
    }

    async fn drop_database(&self, name: &str) -> AppResult<()> {
        let mut conn = self.admin_connection().await?;
        let statement = format!("DROP DATABASE IF EXISTS {}", quote_identifier(name));
        let result = conn
            .execute(statement.as_str())
            .await
            .map(|_| ())
            .map_err(query_error);
        Self::close_admin(conn).await;
        result
    }

    async fn list_tables(&self) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT tablename::text FROM pg_catalog.pg_tables
             WHERE schemaname = current_schema()
             ORDER BY tablename",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)
    }

    async fn readwrite_check(&self, message: &str) -> AppResult<i64> {
        let mut tx = self.pool.begin().await.map_err(query_error)?;
        sqlx::query(CREATE_TABLE_SQL)
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;
        sqlx::query("INSERT INTO test_connection (message) VALUES ($1)")
            .bind(message)
            .execute(&mut *tx)
            .await
            .map_err(query_error)?;
        tx.commit().await.map_err(query_error)?;

        sqlx::query_scalar::<_, i64>("SELECT count(*) FROM test_connection")
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)
    }
}
