//! Defers an offset store to the scoped command registry so it only takes effect once the
//! user's own transaction actually commits.

use std::sync::Arc;

use async_trait::async_trait;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::topic_partition_list::{Offset, TopicPartitionList};
use sqlx::{Postgres, Transaction};

use outbox_mq_outbox::{OutboxError, OutboxResult, ScopedCommand};

/// Stores `offset + 1` (the next offset to read) via the consumer's store-offset API. This
/// updates librdkafka's in-memory offset store only — the actual commit to the broker follows
/// the client's `auto.commit.interval.ms`, same as any other `enable.auto.commit=false` consumer
/// that calls `store_offset` itself.
///
/// Deliberately a no-op inside the transaction: if the scope's transaction fails to commit, the
/// offset must not advance, so the store only happens in [`ScopedCommand::after_commit`].
pub struct OffsetCommitCommand {
    consumer: Arc<StreamConsumer>,
    topic: String,
    partition: i32,
    offset: i64,
}

impl OffsetCommitCommand {
    pub fn new(consumer: Arc<StreamConsumer>, topic: String, partition: i32, offset: i64) -> Self {
        Self { consumer, topic, partition, offset }
    }
}

#[async_trait]
impl ScopedCommand for OffsetCommitCommand {
    async fn execute_in_transaction(&self, _tx: &mut Transaction<'_, Postgres>) -> OutboxResult<()> {
        Ok(())
    }

    async fn after_commit(&self) -> OutboxResult<()> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(&self.topic, self.partition, Offset::Offset(self.offset + 1))
            .map_err(|e| OutboxError::Other(anyhow::anyhow!("invalid offset assignment: {e}")))?;

        self.consumer
            .store_offsets(&tpl)
            .map_err(|e| OutboxError::Other(anyhow::anyhow!("failed to store offset: {e}")))
    }
}
