//! Error types for the outbox store, command registry, and polling worker.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for outbox operations.
pub type OutboxResult<T> = Result<T, OutboxError>;

/// Errors that can occur during outbox operations.
#[derive(Error, Debug)]
pub enum OutboxError {
    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Outbox row not found by id
    #[error("outbox row not found: {0}")]
    RowNotFound(Uuid),

    /// Failed to publish a message to the broker
    #[error("publish failed: {0}")]
    PublishFailed(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No route registered for a message's type tag; the worker leaves the row in place.
    #[error("no dispatch route registered for type: {0}")]
    UnknownType(String),

    /// Generic error with context
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl OutboxError {
    /// True for connection/pool errors a wrapping retry stage is allowed to retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OutboxError::Database(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed)
        )
    }
}
