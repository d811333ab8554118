//! In-memory backends for tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use common::errors::{AppError, AppResult};
use common::models::TestRecord;

use crate::service::{CacheBackend, CreateOutcome, DatabaseBackend};

#[derive(Default)]
struct DbState {
    table_created: bool,
    next_id: i32,
    rows: Vec<TestRecord>,
    databases: BTreeSet<String>,
    drops: usize,
}

/// Behaves like a fresh PostgreSQL server holding the default databases.
pub struct MemoryDatabase {
    state: Mutex<DbState>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        let state = DbState {
            databases: ["postgres", "openLLM"].into_iter().map(String::from).collect(),
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn has_database(&self, name: &str) -> bool {
        self.state.lock().unwrap().databases.contains(name)
    }

    pub fn drop_count(&self) -> usize {
        self.state.lock().unwrap().drops
    }

    fn insert_row(state: &mut DbState, message: &str) -> AppResult<TestRecord> {
        if !state.table_created {
            return Err(AppError::DatabaseQuery(
                "relation \"test_connection\" does not exist".into(),
            ));
        }
        state.next_id += 1;
        let record = TestRecord {
            id: state.next_id,
            message: message.to_string(),
            created_at: Some("2026-01-01 00:00:00".into()),
        };
        state.rows.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl DatabaseBackend for MemoryDatabase {
    async fn version(&self) -> AppResult<String> {
        Ok("PostgreSQL 16.0 (memory)".into())
    }

    async fn create_table(&self) -> AppResult<()> {
        self.state.lock().unwrap().table_created = true;
        Ok(())
    }

    async fn insert(&self, message: &str) -> AppResult<TestRecord> {
        Self::insert_row(&mut self.state.lock().unwrap(), message)
    }

    async fn recent(&self, limit: i64) -> AppResult<Vec<TestRecord>> {
        let state = self.state.lock().unwrap();
        if !state.table_created {
            return Err(AppError::DatabaseQuery(
                "relation \"test_connection\" does not exist".into(),
            ));
        }
        Ok(state
            .rows
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn create_database(&self, name: &str) -> AppResult<CreateOutcome> {
        let mut state = self.state.lock().unwrap();
        if state.databases.insert(name.to_string()) {
            Ok(CreateOutcome::Created)
        } else {
            Ok(CreateOutcome::AlreadyExists)
        }
    }

    async fn drop_database(&self, name: &str) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        state.drops += 1;
        state.databases.remove(name);
        Ok(())
    }

    async fn list_tables(&self) -> AppResult<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(if state.table_created {
            vec!["test_connection".into()]
        } else {
            vec![]
        })
    }

    async fn readwrite_check(&self, message: &str) -> AppResult<i64> {
        let mut state = self.state.lock().unwrap();
        state.table_created = true;
        Self::insert_row(&mut state, message)?;
        Ok(state.rows.len() as i64)
    }
}

/// Every call fails as if the server refused connections.
pub struct UnreachableDatabase;

fn refused<T>() -> AppResult<T> {
    Err(AppError::DatabaseQuery("connection refused".into()))
}

#[async_trait]
impl DatabaseBackend for UnreachableDatabase {
    async fn version(&self) -> AppResult<String> {
        refused()
    }
    async fn create_table(&self) -> AppResult<()> {
        refused()
    }
    async fn insert(&self, _message: &str) -> AppResult<TestRecord> {
        refused()
    }
    async fn recent(&self, _limit: i64) -> AppResult<Vec<TestRecord>> {
        refused()
    }
    async fn create_database(&self, _name: &str) -> AppResult<CreateOutcome> {
        refused()
    }
    async fn drop_database(&self, _name: &str) -> AppResult<()> {
        refused()
    }
    async fn list_tables(&self) -> AppResult<Vec<String>> {
        refused()
    }
    async fn readwrite_check(&self, _message: &str) -> AppResult<i64> {
        refused()
    }
}

/// Key-value store with Redis TTL conventions.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Option<Instant>)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Stores an entry without expiration.
    pub fn insert_persistent(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), None));
    }

    fn live(&self, key: &str) -> Option<(String, Option<Instant>)> {
        let mut entries = self.entries.lock().unwrap();
        let expired = matches!(
            entries.get(key),
            Some((_, Some(deadline))) if *deadline <= Instant::now()
        );
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).cloned()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn ping(&self) -> AppResult<bool> {
        Ok(true)
    }

    async fn server_version(&self) -> AppResult<Option<String>> {
        Ok(Some("7.2.4".into()))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> AppResult<()> {
        let deadline = Instant::now() + Duration::from_secs(ttl_secs);
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), Some(deadline)));
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.live(key).map(|(value, _)| value))
    }

    async fn ttl(&self, key: &str) -> AppResult<i64> {
        Ok(match self.live(key) {
            None => -2,
            Some((_, None)) => -1,
            Some((_, Some(deadline))) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                // Redis rounds the remaining milliseconds to the nearest second.
                ((remaining.as_millis() + 500) / 1000) as i64
            }
        })
    }
}

/// Every call fails as if the server were down.
pub struct UnreachableCache;

fn cache_down<T>() -> AppResult<T> {
    Err(AppError::RedisOperation("Connection refused (os error 111)".into()))
}

#[async_trait]
impl CacheBackend for UnreachableCache {
    async fn ping(&self) -> AppResult<bool> {
        cache_down()
    }
    async fn server_version(&self) -> AppResult<Option<String>> {
        cache_down()
    }
    async fn set_with_ttl(&self, _key: &str, _value: &str, _ttl_secs: u64) -> AppResult<()> {
        cache_down()
    }
    async fn get(&self, _key: &str) -> AppResult<Option<String>> {
        cache_down()
    }
    async fn ttl(&self, _key: &str) -> AppResult<i64> {
        cache_down()
    }
}
