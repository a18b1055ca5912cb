//! Producer-side dispatch strategies and the broker publisher contract.

use async_trait::async_trait;
use outbox_mq_envelope::Headers;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{OutboxError, OutboxResult};
use crate::message::OutboxMessage;
use crate::registry::ScopedCommand;
use crate::repository::OutboxRepository;

/// How a `produce` call turns into broker delivery. Chosen per topic (§3.4 `producer` settings).
#[derive(Debug, Clone)]
pub enum ProduceStrategy {
    /// Insert the outbox row and rely solely on the polling worker to publish it.
    BackgroundOnly,
    /// Insert the outbox row, then attempt an immediate publish after commit; delete the row on
    /// success, leave it for the worker on failure.
    ImmediateWithFallback,
    /// Skip the outbox entirely; publish without awaiting broker acknowledgement.
    FireForget,
    /// Skip the outbox; publish and wait up to `timeout` for acknowledgement, then drop the
    /// outcome either way.
    AwaitForget(Duration),
}

/// Publishes already-serialized envelope bytes to a broker topic.
#[async_trait]
pub trait BrokerPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: Option<&str>, payload: &[u8], headers: &Headers) -> OutboxResult<()>;
}

/// `rdkafka`-backed publisher. The producer MUST be configured with `enable.idempotence = true`
/// and `acks = all` for the at-least-once guarantees this crate family assumes.
pub struct KafkaBrokerPublisher {
    producer: FutureProducer,
}

impl KafkaBrokerPublisher {
    pub fn new(producer: FutureProducer) -> Self {
        Self { producer }
    }
}

#[async_trait]
impl BrokerPublisher for KafkaBrokerPublisher {
    async fn publish(&self, topic: &str, key: Option<&str>, payload: &[u8], headers: &Headers) -> OutboxResult<()> {
        let mut owned_headers = OwnedHeaders::new();
        for (name, value) in headers.iter() {
            owned_headers = owned_headers.insert(Header { key: name, value: Some(value.as_bytes()) });
        }

        let mut record = FutureRecord::to(topic).payload(payload).headers(owned_headers);
        if let Some(key) = key {
            record = record.key(key);
        }

        self.producer
            .send(record, Duration::from_secs(30))
            .await
            .map_err(|(err, _)| OutboxError::PublishFailed(format!("kafka publish failed: {err}")))?;

        info!(topic, "message published to broker");
        Ok(())
    }
}

/// A produce call wrapped as a [`ScopedCommand`], dispatched per [`ProduceStrategy`].
pub struct ProduceCommand {
    message: OutboxMessage,
    strategy: ProduceStrategy,
    repository: Arc<dyn OutboxRepository>,
    publisher: Arc<dyn BrokerPublisher>,
}

impl ProduceCommand {
    pub fn new(
        message: OutboxMessage,
        strategy: ProduceStrategy,
        repository: Arc<dyn OutboxRepository>,
        publisher: Arc<dyn BrokerPublisher>,
    ) -> Self {
        Self { message, strategy, repository, publisher }
    }

    async fn publish_now(&self) -> OutboxResult<()> {
        self.publisher
            .publish(&self.message.topic, Some(&self.message.aggregate_id), &self.message.payload, &self.message.headers)
            .await
    }
}

#[async_trait]
impl ScopedCommand for ProduceCommand {
    async fn execute_in_transaction(&self, tx: &mut Transaction<'_, Postgres>) -> OutboxResult<()> {
        match self.strategy {
            ProduceStrategy::BackgroundOnly | ProduceStrategy::ImmediateWithFallback => {
                self.repository.insert(tx, &self.message).await
            }
            ProduceStrategy::FireForget | ProduceStrategy::AwaitForget(_) => Ok(()),
        }
    }

    async fn after_commit(&self) -> OutboxResult<()> {
        match self.strategy {
            ProduceStrategy::BackgroundOnly => Ok(()),
            ProduceStrategy::ImmediateWithFallback => match self.publish_now().await {
                Ok(()) => {
                    // Best-effort: if the delete races with the worker picking the row up first,
                    // the row is simply gone already and this is not an error for the caller.
                    if let Err(e) = self.repository.delete(self.message.id).await {
                        warn!(id = %self.message.id, error = ?e, "fallback publish succeeded but row delete failed");
                    }
                    Ok(())
                }
                Err(e) => {
                    warn!(id = %self.message.id, error = ?e, "immediate fallback publish failed, worker will retry");
                    Ok(())
                }
            },
            ProduceStrategy::FireForget => {
                if let Err(e) = self.publish_now().await {
                    warn!(topic = %self.message.topic, error = ?e, "fire-and-forget publish failed");
                }
                Ok(())
            }
            ProduceStrategy::AwaitForget(timeout) => {
                match tokio::time::timeout(timeout, self.publish_now()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!(topic = %self.message.topic, error = ?e, "await-forget publish failed"),
                    Err(_) => warn!(topic = %self.message.topic, ?timeout, "await-forget publish timed out"),
                }
                Ok(())
            }
        }
    }
}
