//! Durable storage for outbox rows, plus the worker-ownership predicates pushed into the
//! polling query.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outbox_mq_envelope::Headers;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{OutboxError, OutboxResult};
use crate::message::OutboxMessage;

/// Which rows a worker instance is allowed to claim.
///
/// `Partitioned` pushes `mod(abs(hashtext(aggregate_id)), n) = i` into the SQL query itself so
/// non-owned rows are never loaded — reassignment when `n` changes is out of scope; operators
/// restart workers with the same `i` after a resize.
#[derive(Debug, Clone, Copy)]
pub enum WorkerOwnership {
    SingleNode,
    Partitioned { partitions: u32, index: u32 },
}

impl WorkerOwnership {
    fn sql_filter(&self) -> String {
        match self {
            WorkerOwnership::SingleNode => "TRUE".to_string(),
            WorkerOwnership::Partitioned { partitions, index } => {
                format!("mod(abs(hashtext(aggregate_id)), {partitions}) = {index}")
            }
        }
    }
}

#[async_trait]
pub trait OutboxRepository: Send + Sync {
    /// Insert a new row within a transaction. Callers MUST run this inside the same
    /// transaction as the domain writes it accompanies.
    async fn insert(&self, tx: &mut Transaction<'_, Postgres>, message: &OutboxMessage) -> OutboxResult<()>;

    /// Fetch rows owned by `ownership`, oldest-first, up to `limit`.
    async fn get_pending(&self, ownership: WorkerOwnership, limit: i64) -> OutboxResult<Vec<OutboxMessage>>;

    /// Delete a row after a successful publish, in its own small transaction.
    async fn delete(&self, id: Uuid) -> OutboxResult<()>;

    /// Record a failed publish attempt: increments `retry_count`, stores `last_error`. The row
    /// is left in place for the next poll.
    async fn mark_failed(&self, id: Uuid, error: &str) -> OutboxResult<()>;

    /// Pending count and the age in seconds of the oldest pending row (0 if none pending).
    async fn pending_stats(&self) -> OutboxResult<(i64, i64)>;
}

pub struct SqlxOutboxRepository {
    pool: PgPool,
}

impl SqlxOutboxRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reset `retry_count`/`last_error` for still-pending rows created at or after `since`,
    /// forcing the worker to retry them on its next poll regardless of backoff.
    ///
    /// Rows that already published successfully no longer exist in the table (deleted on
    /// publish) — replay only ever affects rows that are still stuck.
    pub async fn replay_since(&self, since: DateTime<Utc>) -> OutboxResult<u64> {
        let res = sqlx::query(
            r#"
            UPDATE outbox_messages
            SET retry_count = 0, last_error = NULL
            WHERE created_at >= $1
            "#,
        )
        .bind(since)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected())
    }

    /// Same as [`Self::replay_since`] but scoped to an id range (inclusive), for operational
    /// backfill of a known batch.
    pub async fn replay_range(&self, from_id: Uuid, to_id: Uuid) -> OutboxResult<u64> {
        let res = sqlx::query(
            r#"
            UPDATE outbox_messages
            SET retry_count = 0, last_error = NULL
            WHERE id BETWEEN $1 AND $2
            "#,
        )
        .bind(from_id)
        .bind(to_id)
        .execute(&self.pool)
        .await?;

        Ok(res.rows_affected())
    }
}

#[async_trait]
impl OutboxRepository for SqlxOutboxRepository {
    async fn insert(&self, tx: &mut Transaction<'_, Postgres>, message: &OutboxMessage) -> OutboxResult<()> {
        let headers_json = serde_json::to_value(&message.headers)?;

        sqlx::query(
            r#"
            INSERT INTO outbox_messages (
                id, aggregate_id, topic, "type", payload, headers,
                created_at, partition_owner, retry_count, last_error
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(message.id)
        .bind(&message.aggregate_id)
        .bind(&message.topic)
        .bind(&message.type_name)
        .bind(&message.payload)
        .bind(&headers_json)
        .bind(message.created_at)
        .bind(message.partition_owner)
        .bind(message.retry_count)
        .bind(&message.last_error)
        .execute(&mut **tx)
        .await?;

        debug!(id = %message.id, topic = %message.topic, "outbox row inserted");
        Ok(())
    }

    async fn get_pending(&self, ownership: WorkerOwnership, limit: i64) -> OutboxResult<Vec<OutboxMessage>> {
        let sql = format!(
            r#"
            SELECT id, aggregate_id, topic, "type", payload, headers,
                   created_at, partition_owner, retry_count, last_error
            FROM outbox_messages
            WHERE {}
            ORDER BY created_at ASC, retry_count ASC
            LIMIT $1
            "#,
            ownership.sql_filter()
        );

        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?;

        let messages = rows
            .into_iter()
            .map(|row| {
                let headers_json: serde_json::Value = row.try_get("headers")?;
                let headers: Headers = serde_json::from_value(headers_json)
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

                Ok(OutboxMessage {
                    id: row.try_get("id")?,
                    aggregate_id: row.try_get("aggregate_id")?,
                    topic: row.try_get("topic")?,
                    type_name: row.try_get("type")?,
                    payload: row.try_get("payload")?,
                    headers,
                    created_at: row.try_get("created_at")?,
                    partition_owner: row.try_get("partition_owner")?,
                    retry_count: row.try_get("retry_count")?,
                    last_error: row.try_get("last_error")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(messages)
    }

    async fn delete(&self, id: Uuid) -> OutboxResult<()> {
        let result = sqlx::query("DELETE FROM outbox_messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            warn!(id = %id, "outbox row already gone when deleting after publish");
            return Err(OutboxError::RowNotFound(id));
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> OutboxResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE outbox_messages
            SET retry_count = retry_count + 1, last_error = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(id = %id, "outbox row not found when marking failed");
            return Err(OutboxError::RowNotFound(id));
        }
        Ok(())
    }

    async fn pending_stats(&self) -> OutboxResult<(i64, i64)> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*)::BIGINT AS pending,
                COALESCE(EXTRACT(EPOCH FROM (NOW() - MIN(created_at)))::BIGINT, 0) AS age_seconds
            FROM outbox_messages
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let pending: i64 = row.try_get("pending")?;
        let age: i64 = row.try_get("age_seconds")?;
        Ok((pending, age))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_node_has_no_filter() {
        assert_eq!(WorkerOwnership::SingleNode.sql_filter(), "TRUE");
    }

    #[test]
    fn partitioned_filter_binds_n_and_i() {
        let filter = WorkerOwnership::Partitioned { partitions: 4, index: 2 }.sql_filter();
        assert_eq!(filter, "mod(abs(hashtext(aggregate_id)), 4) = 2");
    }
}
