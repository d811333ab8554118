//! Application state for the diagnostic service.

use std::sync::Arc;

use common::config::AppConfig;
use common::errors::AppResult;

use crate::cache::RedisBackend;
use crate::postgres::PgBackend;
use crate::service::{CacheBackend, DatabaseBackend};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub database: Arc<dyn DatabaseBackend>,
    pub cache: Arc<dyn CacheBackend>,
}

impl AppState {
    /// Creates the backends from configuration. Nothing connects yet.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let database = PgBackend::connect_lazy(&config)?;
        let cache = RedisBackend::open(&config)?;
        Ok(Self::with_backends(config, Arc::new(database), Arc::new(cache)))
    }

    /// Creates the state around existing backends.
    pub fn with_backends(
        config: AppConfig,
        database: Arc<dyn DatabaseBackend>,
        cache: Arc<dyn CacheBackend>,
    ) -> Self {
        Self {
            config,
            database,
            cache,
        }
    }
}
