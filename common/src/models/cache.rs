//! Redis endpoint parameters.

use serde::Deserialize;
use utoipa::IntoParams;

/// Expiration applied by `POST /redis/write`, in seconds.
pub const CACHE_TTL_SECS: u64 = 300;

const DEFAULT_KEY: &str = "test_key";
const DEFAULT_VALUE: &str = "hello_redis";

fn default_key() -> String {
    DEFAULT_KEY.to_string()
}

fn default_value() -> String {
    DEFAULT_VALUE.to_string()
}

/// Query parameters for `POST /redis/write`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CacheWriteParams {
    /// Key to write (default `test_key`).
    #[serde(default = "default_key")]
    pub key: String,
    /// Value to store (default `hello_redis`).
    #[serde(default = "default_value")]
    pub value: String,
}

impl Default for CacheWriteParams {
    fn default() -> Self {
        Self {
            key: default_key(),
            value: default_value(),
        }
    }
}

/// Query parameters for `GET /redis/read`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CacheKeyParams {
    /// Key to read (default `test_key`).
    #[serde(default = "default_key")]
    pub key: String,
}

impl Default for CacheKeyParams {
    fn default() -> Self {
        Self { key: default_key() }
    }
}
