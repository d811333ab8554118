//! Redis backend.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use common::config::AppConfig;
use common::errors::{AppError, AppResult};

use crate::service::CacheBackend;

/// Redis implementation of [`CacheBackend`].
///
/// Holds only the parsed client; each operation acquires its own connection.
pub struct RedisBackend {
    client: redis::Client,
}

impl RedisBackend {
    /// Parses the connection string without connecting.
    pub fn open(config: &AppConfig) -> AppResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())
            .map_err(|e| AppError::Config(format!("REDIS_URL: {}", e)))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> AppResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(op_error)
    }
}

fn op_error(e: redis::RedisError) -> AppError {
    AppError::RedisOperation(e.to_string())
}

/// Extracts `field` from an `INFO` reply.
fn parse_info_field(info: &str, field: &str) -> Option<String> {
    info.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| *key == field)
        .map(|(_, value)| value.trim().to_string())
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn ping(&self) -> AppResult<bool> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(op_error)?;
        Ok(pong.eq_ignore_ascii_case("PONG"))
    }

    async fn server_version(&self) -> AppResult<Option<String>> {
        let mut conn = self.connection().await?;
        let info: String = redis::cmd("INFO")
            .arg("server")
            .query_async(&mut conn)
            .await
            .map_err(op_error)?;
        Ok(parse_info_field(&info, "redis_version"))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> AppResult<()> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_secs)
            .await
            .map_err(op_error)
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key).await.map_err(op_error)
    }

    async fn ttl(&self, key: &str) -> AppResult<i64> {
        let mut conn = self.connection().await?;
        conn.ttl::<_, i64>(key).await.map_err(op_error)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use common::config::DEFAULT_DATABASE_URL;

    use crate::service::DiagnosticService;
    use crate::testing::MemoryDatabase;

    const INFO_SERVER: &str = "# Server\r\nredis_version:7.2.4\r\nredis_git_sha1:00000000\r\nredis_mode:standalone\r\nos:Linux 6.1.0 x86_64\r\n";

    /// Nothing listens on port 1, so connecting fails immediately.
    const UNREACHABLE_URL: &str = "redis://127.0.0.1:1";

    fn config(redis_url: &str) -> AppConfig {
        AppConfig {
            service_name: "testdb".into(),
            host: "127.0.0.1".into(),
            port: 0,
            database_url: DEFAULT_DATABASE_URL.into(),
            redis_url: redis_url.into(),
            max_connections: 5,
            connect_timeout_secs: 1,
        }
    }

    /// Live tests read `TEST_REDIS_URL`, falling back to the local default.
    fn live_backend() -> RedisBackend {
        let url = std::env::var("TEST_REDIS_URL")
            .unwrap_or_else(|_| common::config::DEFAULT_REDIS_URL.to_string());
        RedisBackend::open(&config(&url)).unwrap()
    }

    #[test]
    fn test_parse_info_field() {
        assert_eq!(
            parse_info_field(INFO_SERVER, "redis_version").as_deref(),
            Some("7.2.4")
        );
        assert_eq!(
            parse_info_field(INFO_SERVER, "os").as_deref(),
            Some("Linux 6.1.0 x86_64")
        );
        assert_eq!(parse_info_field(INFO_SERVER, "redis_build_id"), None);
    }

    #[test]
    fn test_open_with_password_url() {
        assert!(RedisBackend::open(&config("redis://:secret@127.0.0.1:6379")).is_ok());
    }

    #[test]
    fn test_open_rejects_bad_url() {
        let result = RedisBackend::open(&config("http://127.0.0.1:6379"));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_without_connection_prefix() {
        let backend = RedisBackend::open(&config(UNREACHABLE_URL)).unwrap();
        let err = backend.set_with_ttl("k", "v", 300).await.unwrap_err();
        assert!(matches!(err, AppError::RedisOperation(_)));
        assert!(!err.to_string().starts_with("Redis connection failed"));
    }

    #[tokio::test]
    async fn test_unreachable_server_connect_check_has_prefix() {
        let backend = RedisBackend::open(&config(UNREACHABLE_URL)).unwrap();
        let service = DiagnosticService::new(Arc::new(MemoryDatabase::new()), Arc::new(backend));
        let err = service.cache_status().await.unwrap_err();
        assert!(matches!(err, AppError::RedisConnection(_)));
        assert!(err.to_string().starts_with("Redis connection failed: "));
    }

    #[tokio::test]
    #[ignore = "needs a running Redis (TEST_REDIS_URL)"]
    async fn test_live_write_then_read() {
        let backend = live_backend();
        assert!(backend.ping().await.unwrap());
        assert!(backend.server_version().await.unwrap().is_some());

        let key = format!("testdb_live_{}", std::process::id());
        backend.set_with_ttl(&key, "live value", 300).await.unwrap();
        assert_eq!(backend.get(&key).await.unwrap().as_deref(), Some("live value"));
        let ttl = backend.ttl(&key).await.unwrap();
        assert!(ttl > 0 && ttl <= 300, "ttl {ttl}");

        let missing = format!("testdb_live_missing_{}", std::process::id());
        assert_eq!(backend.get(&missing).await.unwrap(), None);
        assert_eq!(backend.ttl(&missing).await.unwrap(), -2);
    }
}
