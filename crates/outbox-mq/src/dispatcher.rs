//! Producer dispatcher (C7): turns a [`TopicConfig<T>`]'s producer settings into a concrete call
//! that serializes the message, stamps key/headers, injects trace context, and defers delivery
//! onto a [`Scope`] per the topic's configured [`ProduceStrategy`].
//!
//! This is deliberately not a generic `Stage<T>` chain the way the consumer side reuses
//! [`outbox_mq_middleware::Chain`] — a produce call has exactly one fixed sequence of steps
//! (serialize, key/headers, trace, strategy) and no user-pluggable stage sits in the middle of
//! it, so a dispatcher method reads more plainly than a chain built and run once per call.

use std::sync::Arc;

use outbox_mq_outbox::{
    BrokerPublisher, OutboxError, OutboxMessage, OutboxRepository, OutboxResult, ProduceCommand,
};
use outbox_mq_topic::TopicConfig;
use outbox_mq_trace::{inject_current_context, produce_span};
use tracing::debug;

use crate::scope::Scope;

/// Binds one [`TopicConfig<T>`] to the broker publisher and outbox repository it dispatches
/// through. Built once per topic at startup; cheap to clone since everything behind it is an
/// `Arc`.
pub struct ProducerDispatcher<T> {
    topic: Arc<TopicConfig<T>>,
    repository: Arc<dyn OutboxRepository>,
    publisher: Arc<dyn BrokerPublisher>,
}

impl<T> ProducerDispatcher<T> {
    pub fn new(
        topic: Arc<TopicConfig<T>>,
        repository: Arc<dyn OutboxRepository>,
        publisher: Arc<dyn BrokerPublisher>,
    ) -> Self {
        Self { topic, repository, publisher }
    }

    /// Serialize `message` and defer its delivery onto `scope` per this topic's configured
    /// strategy. Nothing reaches the database or the broker until `scope.commit()` runs.
    ///
    /// `aggregate_id` falls back to an empty string when the topic has no key extractor —
    /// `OutboxMessage::aggregate_id` is non-nullable (the worker's ownership hash needs something
    /// to hash), while the broker key itself may legitimately be absent.
    pub fn produce(&self, scope: &mut Scope, message: T) -> OutboxResult<()> {
        let mut headers = self.topic.extra_headers_for(&message);
        let span = produce_span(&self.topic.name);
        let _entered = span.enter();
        inject_current_context(&mut headers);

        let payload = self
            .topic
            .serializer()
            .serialize(&mut headers, &message)
            .map_err(|e| OutboxError::Other(anyhow::anyhow!(e)))?;

        let aggregate_id = self.topic.key_for(&message).unwrap_or_default();
        debug!(topic = %self.topic.name, key = %aggregate_id, payload_size = payload.len(), "dispatching produce call");

        let outbox_message = OutboxMessage::new(
            aggregate_id,
            self.topic.name.clone(),
            self.topic.serializer().type_tag().to_string(),
            payload,
            headers,
        );

        scope.push(ProduceCommand::new(
            outbox_message,
            self.topic.producer.outbox_strategy.clone(),
            self.repository.clone(),
            self.publisher.clone(),
        ));
        Ok(())
    }
}
