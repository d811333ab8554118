//! Test table row model.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A row of the `test_connection` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TestRecord {
    /// Generated identifier.
    pub id: i32,
    /// Stored message.
    pub message: String,
    /// Server-side creation time as text, `None` if the column is NULL.
    pub created_at: Option<String>,
}
