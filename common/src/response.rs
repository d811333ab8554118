//! Response envelope primitives.
//!
//! Successful responses are flat objects led by a `status` field; failures
//! carry a single `detail` message.

use serde::Serialize;
use utoipa::ToSchema;

/// Value of the `status` field in a response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Generic success.
    Ok,
    /// A connect-test reached the backend.
    Connected,
    /// A row was inserted.
    Inserted,
    /// A database was created.
    Created,
    /// The database to create was already present.
    AlreadyExists,
    /// A database was dropped (or did not exist).
    Dropped,
    /// A cache entry was written.
    Written,
    /// A combined-test section failed.
    Error,
}

/// Error body returned for every failed request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable failure message.
    pub detail: String,
}
