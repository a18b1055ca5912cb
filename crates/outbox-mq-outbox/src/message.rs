//! The persisted outbox row.

use chrono::{DateTime, Utc};
use outbox_mq_envelope::Headers;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A row in `outbox_messages`.
///
/// Rows are append-only until published, then deleted — there is no `published_at` column.
/// `retry_count`/`last_error` track failed publish attempts for a row still awaiting
/// publication; they are reset by [`crate::repository::OutboxRepository::replay_since`] and
/// [`crate::repository::OutboxRepository::replay_range`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxMessage {
    /// Primary key. Expected to be a v7 (time-ordered) UUID so per-aggregate publish order
    /// tracks insertion order.
    pub id: Uuid,

    /// Partition key surrogate. Not a foreign key — just the string the worker hashes for
    /// ownership partitioning and the producer uses to key the broker record.
    pub aggregate_id: String,

    /// Destination topic. Always populated: either the logical type name or a configured
    /// override, never null.
    pub topic: String,

    /// Stable type tag used by the worker's type-dispatch table.
    pub type_name: String,

    /// Serialized envelope body.
    pub payload: Vec<u8>,

    /// Full header set captured at produce time.
    pub headers: Headers,

    pub created_at: DateTime<Utc>,

    /// Nullable hash bucket for coordination between worker instances.
    pub partition_owner: Option<i32>,

    pub retry_count: i32,

    pub last_error: Option<String>,
}

impl OutboxMessage {
    /// Construct a new row ready for insertion. `id` is generated as a v7 UUID so rows for the
    /// same aggregate sort in publish order.
    pub fn new(aggregate_id: String, topic: String, type_name: String, payload: Vec<u8>, headers: Headers) -> Self {
        Self {
            id: Uuid::now_v7(),
            aggregate_id,
            topic,
            type_name,
            payload,
            headers,
            created_at: Utc::now(),
            partition_owner: None,
            retry_count: 0,
            last_error: None,
        }
    }

    pub fn with_partition_owner(mut self, owner: i32) -> Self {
        self.partition_owner = Some(owner);
        self
    }
}
