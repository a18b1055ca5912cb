//! Error types for the inbox crate.

use thiserror::Error;

/// Result type for inbox operations.
pub type InboxResult<T> = Result<T, InboxError>;

/// Errors that can occur while recording or checking inbox fingerprints.
#[derive(Error, Debug)]
pub enum InboxError {
    /// Database operation failed (connection, query execution, etc.)
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The handler invoked by `process_if_new` returned an error.
    #[error("handler failed: {0}")]
    HandlerFailed(String),

    /// The type name or dedup value was rejected (empty or too long).
    #[error("invalid dedup key: {0}")]
    InvalidDedupKey(String),

    /// JSON serialization/deserialization error for metadata.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl InboxError {
    /// True for a Postgres unique-violation (code `23505`) — the expected outcome when two
    /// consumers race to mark the same fingerprint processed, not a real failure.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            InboxError::Database(sqlx_err) => sqlx_err
                .as_database_error()
                .and_then(|db_err| db_err.code().map(|c| c == "23505"))
                .unwrap_or(false),
            _ => false,
        }
    }

    /// True for connection/pool errors a wrapping retry stage is allowed to retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            InboxError::Database(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed)
        )
    }
}
