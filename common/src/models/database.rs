//! PostgreSQL endpoint parameters.
//!
//! Each optional query parameter has a named default so the defaults are
//! visible in one place.

use std::borrow::Cow;

use serde::Deserialize;
use utoipa::IntoParams;
use validator::{Validate, ValidationError};

/// Databases that may never be dropped.
pub const PROTECTED_DATABASES: [&str; 2] = ["postgres", "openLLM"];

const DEFAULT_MESSAGE: &str = "hello from testdb";
const DEFAULT_DB_NAME: &str = "test_newdb";

fn default_message() -> String {
    DEFAULT_MESSAGE.to_string()
}

fn default_db_name() -> String {
    DEFAULT_DB_NAME.to_string()
}

/// Query parameters for `POST /pg/insert`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InsertParams {
    /// Message to store (default `hello from testdb`).
    #[serde(default = "default_message")]
    pub message: String,
}

impl Default for InsertParams {
    fn default() -> Self {
        Self {
            message: default_message(),
        }
    }
}

/// Query parameters for `POST /pg/create-db`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DatabaseNameParams {
    /// Target database (default `test_newdb`).
    #[serde(default = "default_db_name")]
    pub db_name: String,
}

impl Default for DatabaseNameParams {
    fn default() -> Self {
        Self {
            db_name: default_db_name(),
        }
    }
}

/// Query parameters for `DELETE /pg/drop-db`.
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DropDatabaseParams {
    /// Target database (default `test_newdb`); protected names are refused.
    #[serde(default = "default_db_name")]
    #[validate(custom(function = "reject_protected"))]
    pub db_name: String,
}

impl Default for DropDatabaseParams {
    fn default() -> Self {
        Self {
            db_name: default_db_name(),
        }
    }
}

/// Returns true if `name` is one of [`PROTECTED_DATABASES`].
pub fn is_protected(name: &str) -> bool {
    PROTECTED_DATABASES.contains(&name)
}

fn reject_protected(name: &str) -> Result<(), ValidationError> {
    if is_protected(name) {
        return Err(ValidationError::new("protected_database")
            .with_message(Cow::Borrowed("Cannot drop protected database")));
    }
    Ok(())
}
