//! 连接诊断服务模块
//!
//! Backend seams plus the dispatcher that maps one endpoint onto one backend
//! call.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use common::errors::{AppError, AppResult};
use common::models::{DropDatabaseParams, TestRecord, CACHE_TTL_SECS};
use common::response::Status;

/// Maximum rows returned by `GET /pg/read`.
pub const READ_LIMIT: i64 = 10;

/// Key written and read back by the combined test.
pub const TEST_ALL_KEY: &str = "testall_key";
const TEST_ALL_VALUE: &str = "testall_value";
const TEST_ALL_TTL_SECS: u64 = 60;

/// Outcome of a create-database request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

impl From<CreateOutcome> for Status {
    fn from(outcome: CreateOutcome) -> Self {
        match outcome {
            CreateOutcome::Created => Status::Created,
            CreateOutcome::AlreadyExists => Status::AlreadyExists,
        }
    }
}

/// Relational database operations used by the dispatcher.
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// Server version string.
    async fn version(&self) -> AppResult<String>;

    /// Creates the test table if it does not exist.
    async fn create_table(&self) -> AppResult<()>;

    /// Inserts a row and returns it as stored.
    async fn insert(&self, message: &str) -> AppResult<TestRecord>;

    /// Newest rows first, at most `limit`.
    async fn recent(&self, limit: i64) -> AppResult<Vec<TestRecord>>;

    /// Creates a database unless one with that name exists.
    ///
    /// Runs outside any transaction.
    async fn create_database(&self, name: &str) -> AppResult<CreateOutcome>;

    /// Drops a database if it exists. Runs outside any transaction.
    async fn drop_database(&self, name: &str) -> AppResult<()>;

    /// Table names of the current schema, sorted.
    async fn list_tables(&self) -> AppResult<Vec<String>>;

    /// Ensures the table, inserts `message`, commits, and returns the row count.
    async fn readwrite_check(&self, message: &str) -> AppResult<i64>;
}

/// Key-value cache operations used by the dispatcher.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Liveness check.
    async fn ping(&self) -> AppResult<bool>;

    /// Version reported by the server, if any.
    async fn server_version(&self) -> AppResult<Option<String>>;

    /// Writes `value` under `key`, replacing any previous entry.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> AppResult<()>;

    /// Reads the value stored under `key`.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Remaining TTL in seconds using the backend's raw convention
    /// (`-2` missing key, `-1` no expiration).
    async fn ttl(&self, key: &str) -> AppResult<i64>;
}

/// Cached value with its remaining lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRead {
    pub value: Option<String>,
    pub ttl: Option<i64>,
}

/// Dispatches endpoint calls to the configured backends.
pub struct DiagnosticService {
    database: Arc<dyn DatabaseBackend>,
    cache: Arc<dyn CacheBackend>,
}

impl DiagnosticService {
    /// 创建新的诊断服务实例
    pub fn new(database: Arc<dyn DatabaseBackend>, cache: Arc<dyn CacheBackend>) -> Self {
        Self { database, cache }
    }

    /// Connect-test: `SELECT version()`. Failures become connection errors.
    pub async fn database_version(&self) -> AppResult<String> {
        self.database.version().await.map_err(into_unavailable)
    }

    /// Ensures the `test_connection` table exists.
    pub async fn create_table(&self) -> AppResult<()> {
        self.database.create_table().await?;
        tracing::info!("test table ensured");
        Ok(())
    }

    /// Inserts one row and returns it with its generated fields.
    pub async fn insert(&self, message: &str) -> AppResult<TestRecord> {
        let record = self.database.insert(message).await?;
        tracing::info!(id = record.id, "row inserted");
        Ok(record)
    }

    /// Newest rows first, at most ten.
    pub async fn recent_records(&self) -> AppResult<Vec<TestRecord>> {
        self.database.recent(READ_LIMIT).await
    }

    /// Creates `name`, or reports that it already exists.
    pub async fn create_database(&self, name: &str) -> AppResult<CreateOutcome> {
        let outcome = self.database.create_database(name).await?;
        tracing::info!(db_name = %name, outcome = ?outcome, "create database");
        Ok(outcome)
    }

    /// Drops the named database.
    ///
    /// Protected names are rejected before the backend is contacted.
    pub async fn drop_database(&self, params: &DropDatabaseParams) -> AppResult<()> {
        params.validate()?;
        self.database.drop_database(&params.db_name).await?;
        tracing::info!(db_name = %params.db_name, "database dropped");
        Ok(())
    }

    /// Table names in the current schema.
    pub async fn list_tables(&self) -> AppResult<Vec<String>> {
        self.database.list_tables().await
    }

    /// Pings the cache and fetches its version.
    pub async fn cache_status(&self) -> AppResult<(bool, Option<String>)> {
        let ping = self.cache.ping().await.map_err(into_unavailable)?;
        let version = self.cache.server_version().await.map_err(into_unavailable)?;
        Ok((ping, version))
    }

    /// Writes `key` with the fixed TTL and returns that TTL.
    pub async fn cache_write(&self, key: &str, value: &str) -> AppResult<u64> {
        self.cache.set_with_ttl(key, value, CACHE_TTL_SECS).await?;
        tracing::debug!(key = %key, ttl = CACHE_TTL_SECS, "cache entry written");
        Ok(CACHE_TTL_SECS)
    }

    /// Reads `key` and its remaining TTL. Both are `None` for a missing key.
    pub async fn cache_read(&self, key: &str) -> AppResult<CacheRead> {
        let value = self.cache.get(key).await?;
        let ttl = self.cache.ttl(key).await?;
        Ok(CacheRead {
            value,
            ttl: remaining_ttl(ttl),
        })
    }

    /// Runs the database and cache checks one after another.
    ///
    /// A failing section is reported in place and never stops the others.
    pub async fn test_all(&self) -> TestAllReport {
        let pg_connect = self
            .database
            .version()
            .await
            .map(|version| PgConnectSection { version });

        let message = format!("test_all at {}", unix_seconds());
        let pg_readwrite = self
            .database
            .readwrite_check(&message)
            .await
            .map(|row_count| PgReadWriteSection { row_count });

        let redis = self.redis_roundtrip().await;

        TestAllReport {
            pg_connect: Section::record("pg_connect", pg_connect),
            pg_readwrite: Section::record("pg_readwrite", pg_readwrite),
            redis: Section::record("redis", redis),
        }
    }

    async fn redis_roundtrip(&self) -> AppResult<RedisSection> {
        let ping = self.cache.ping().await?;
        self.cache
            .set_with_ttl(TEST_ALL_KEY, TEST_ALL_VALUE, TEST_ALL_TTL_SECS)
            .await?;
        let read_back = self.cache.get(TEST_ALL_KEY).await?;
        Ok(RedisSection { ping, read_back })
    }
}

/// Connect-tests report any failure as the backend being unavailable.
fn into_unavailable(err: AppError) -> AppError {
    match err {
        AppError::DatabaseQuery(msg) => AppError::DatabaseConnection(msg),
        AppError::RedisOperation(msg) => AppError::RedisConnection(msg),
        other => other,
    }
}

/// Maps the backend's negative TTL markers to `None`.
fn remaining_ttl(raw: i64) -> Option<i64> {
    (raw >= 0).then_some(raw)
}

fn unix_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Result of one combined-test section, tagged by `status`.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Section<T> {
    Ok(T),
    Error { detail: String },
}

impl<T> Section<T> {
    fn record(name: &str, result: AppResult<T>) -> Self {
        match result {
            Ok(data) => Section::Ok(data),
            Err(e) => {
                tracing::warn!(section = name, error = %e, "combined test section failed");
                Section::Error {
                    detail: e.to_string(),
                }
            }
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Section::Ok(_))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PgConnectSection {
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PgReadWriteSection {
    pub row_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RedisSection {
    pub ping: bool,
    pub read_back: Option<String>,
}

/// Body of `GET /test-all`.
#[derive(Debug, Serialize)]
pub struct TestAllReport {
    pub pg_connect: Section<PgConnectSection>,
    pub pg_readwrite: Section<PgReadWriteSection>,
    pub redis: Section<RedisSection>,
}
