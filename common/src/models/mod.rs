//! Shared data models.

pub mod cache;
pub mod database;
pub mod record;

pub use cache::{CacheKeyParams, CacheWriteParams, CACHE_TTL_SECS};
pub use database::{DatabaseNameParams, DropDatabaseParams, InsertParams, PROTECTED_DATABASES};
pub use record::TestRecord;
