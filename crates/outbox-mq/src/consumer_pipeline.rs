//! Consumer dispatcher (C8's typed delivery path): the counterpart to
//! [`crate::dispatcher::ProducerDispatcher`] on the consume side. Ties a [`TopicConfig<T>`]'s
//! serializer, header filters, and inbox dedup expression to a [`ConsumerRuntime`], running the
//! `Deserializer -> HeaderFilter -> TraceExtract -> Inbox -> Handler` chain over every fetched
//! envelope so a caller only ever sees messages meant to reach its handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use outbox_mq_consumer::{ConsumerRuntime, HeaderFilterStage, RawEnvelope};
use outbox_mq_envelope::Envelope;
use outbox_mq_inbox::InboxGuard;
use outbox_mq_middleware::{Chain, ChainBuilder, StageResult, Terminal};
use outbox_mq_outbox::ScopedCommand;
use outbox_mq_topic::TopicConfig;
use outbox_mq_trace::consume_span;
use tracing::{debug, warn, Instrument};

/// Records whether the chain actually reached the handler, so [`ConsumerPipeline::recv`] can
/// tell "delivered" apart from "filtered out but otherwise ok" — both return `Ok` from
/// [`Chain::run`], since [`HeaderFilterStage`] short-circuits without treating a non-match as an
/// error.
struct RecordingTerminal {
    delivered: Arc<AtomicBool>,
}

#[async_trait]
impl<T: Send + Sync + 'static> Terminal<T> for RecordingTerminal {
    async fn run(&self, envelope: Envelope<T>) -> StageResult<T> {
        self.delivered.store(true, Ordering::SeqCst);
        Ok(envelope)
    }
}

/// Assembles one topic's consume-path stages into a single delivery surface over a
/// [`ConsumerRuntime`]. Built once per topic at startup, the same way [`crate::ProducerDispatcher`]
/// is built once per topic on the produce side.
pub struct ConsumerPipeline<T> {
    topic: Arc<TopicConfig<T>>,
    chain: Chain<T>,
    inbox: Option<InboxGuard>,
}

impl<T: Send + Sync + 'static> ConsumerPipeline<T> {
    pub fn new(topic: Arc<TopicConfig<T>>, inbox: Option<InboxGuard>) -> Self {
        let filters = topic.consumer.header_filters.clone();
        let chain = ChainBuilder::new().stage_if(!filters.is_empty(), HeaderFilterStage::new(filters)).build();
        Self { topic, chain, inbox }
    }

    /// Pulls raw envelopes from `runtime` until one deserializes, passes every header filter, and
    /// is not an inbox duplicate — or `runtime` is exhausted, in which case this returns `None`.
    ///
    /// A skipped message (bad payload, filtered out, already-processed) still advances the broker
    /// offset immediately via [`ConsumerRuntime::commit_command`]: there is no domain write for it
    /// to ride alongside, so deferring it into the caller's own [`crate::Scope`] the way a
    /// delivered message's offset commit does would hold the offset back for no reason. Only a
    /// message this method returns needs the caller to defer its own `commit_command` onto the
    /// scope handling it.
    pub async fn recv(&self, runtime: &ConsumerRuntime) -> Option<Envelope<T>> {
        loop {
            let raw: RawEnvelope = runtime.recv().await?;
            let topic_name = raw.topic.clone().unwrap_or_else(|| self.topic.name.clone());
            let span = consume_span(&topic_name, &raw.headers);

            if let Some(envelope) = self.process_one(runtime, raw, &topic_name).instrument(span).await {
                return Some(envelope);
            }
        }
    }

    /// One fetched envelope through deserialize -> dedup -> header-filter chain. Returns `None`
    /// for anything that should be skipped (its offset has already been advanced by the time this
    /// returns), `Some` for a message the caller's handler should actually see.
    async fn process_one(&self, runtime: &ConsumerRuntime, raw: RawEnvelope, topic_name: &str) -> Option<Envelope<T>> {
        let message = match self.topic.serializer().deserialize(&raw.headers, &raw.payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(topic = %topic_name, error = %e, "consumer deserialization failed, advancing offset");
                self.advance_past(runtime, &raw).await;
                return None;
            }
        };

        if let Some(inbox) = &self.inbox {
            if let Some(dedup_value) = self.topic.dedup_value_for(&message) {
                match inbox.is_processed(&self.topic.name, &dedup_value).await {
                    Ok(true) => {
                        debug!(topic = %topic_name, dedup_value, "inbox duplicate filtered");
                        self.advance_past(runtime, &raw).await;
                        return None;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!(topic = %topic_name, error = %e, "inbox dedup check failed, delivering anyway");
                    }
                }
            }
        }

        let mut envelope = Envelope::from_parts(Some(message), raw.key.clone(), raw.payload.clone(), raw.headers.clone());
        envelope.topic = raw.topic.clone();
        envelope.partition = raw.partition;
        envelope.offset = raw.offset;
        envelope.timestamp = raw.timestamp;

        let delivered = Arc::new(AtomicBool::new(false));
        let terminal = RecordingTerminal { delivered: delivered.clone() };
        let envelope = match self.chain.run(envelope, &terminal).await {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(topic = %topic_name, error = %e, "consumer chain rejected message, advancing offset");
                self.advance_past(runtime, &raw).await;
                return None;
            }
        };

        if !delivered.load(Ordering::SeqCst) {
            debug!(topic = %topic_name, "envelope did not match header filters, advancing offset");
            self.advance_past(runtime, &raw).await;
            return None;
        }

        Some(envelope)
    }

    async fn advance_past(&self, runtime: &ConsumerRuntime, raw: &RawEnvelope) {
        if let Some(command) = runtime.commit_command(raw) {
            if let Err(e) = command.after_commit().await {
                warn!(error = %e, "failed to advance offset for a skipped message");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbox_mq_envelope::{Headers, JsonSerializer};
    use outbox_mq_topic::TopicConfigBuilder;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct OrderPlaced {
        order_id: String,
    }

    #[test]
    fn pipeline_builds_chain_only_when_filters_present() {
        let topic = Arc::new(TopicConfigBuilder::new(JsonSerializer::<OrderPlaced>::new("OrderPlaced")).build());
        let pipeline = ConsumerPipeline::new(topic, None);
        assert_eq!(pipeline.chain.len(), 0);

        let topic = Arc::new(
            TopicConfigBuilder::new(JsonSerializer::<OrderPlaced>::new("OrderPlaced"))
                .filter("region", "eu")
                .build(),
        );
        let pipeline = ConsumerPipeline::new(topic, None);
        assert_eq!(pipeline.chain.len(), 1);
    }

    #[tokio::test]
    async fn recording_terminal_only_fires_when_chain_calls_next() {
        let delivered = Arc::new(AtomicBool::new(false));
        let terminal = RecordingTerminal { delivered: delivered.clone() };
        let envelope = Envelope::for_message(OrderPlaced { order_id: "o-1".into() });
        terminal.run(envelope).await.unwrap();
        assert!(delivered.load(Ordering::SeqCst));
    }

    #[allow(dead_code)]
    fn assert_headers_type(_: &Headers) {}
}
