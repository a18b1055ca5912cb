//! Public surface: subscribes a consumer group, spawns the fetcher, and exposes a cancellable
//! asynchronous sequence of raw envelopes.

use std::sync::Arc;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backpressure::{self, BackpressureConfig, BackpressureReceiver};
use crate::error::ConsumerResult;
use crate::fetcher::{self, RawEnvelope};
use crate::offset::OffsetCommitCommand;

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub brokers: String,
    pub group_id: String,
    pub topics: Vec<String>,
    pub backpressure: BackpressureConfig,
}

impl ConsumerConfig {
    /// Reads `CONSUMER_MAX_BUFFERED_MESSAGES` with the same fallback-on-parse-failure idiom used
    /// elsewhere in this crate family; everything else must still be supplied by the caller since
    /// brokers/group/topics are deployment-specific.
    pub fn from_env(brokers: String, group_id: String, topics: Vec<String>) -> Self {
        let capacity = std::env::var("CONSUMER_MAX_BUFFERED_MESSAGES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1000);

        Self {
            brokers,
            group_id,
            topics,
            backpressure: BackpressureConfig { capacity, ..BackpressureConfig::default() },
        }
    }
}

/// A single background fetcher feeding a bounded buffer; cancelling stops the fetcher and
/// releases the consumer assignment.
pub struct ConsumerRuntime {
    consumer: Arc<StreamConsumer>,
    receiver: BackpressureReceiver<RawEnvelope>,
    cancellation: CancellationToken,
    fetcher_handle: JoinHandle<()>,
}

impl ConsumerRuntime {
    pub fn start(config: ConsumerConfig) -> ConsumerResult<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "10000")
            .set("heartbeat.interval.ms", "3000")
            .set("max.poll.interval.ms", "300000")
            .create()?;

        let topics: Vec<&str> = config.topics.iter().map(String::as_str).collect();
        consumer.subscribe(&topics)?;

        let consumer = Arc::new(consumer);
        let (sender, receiver) = backpressure::channel(config.backpressure);
        let cancellation = CancellationToken::new();

        let fetcher_handle = tokio::spawn(fetcher::run(consumer.clone(), sender, cancellation.clone()));

        Ok(Self { consumer, receiver, cancellation, fetcher_handle })
    }

    /// Await the next fetched envelope. Returns `None` once cancellation has fired and the
    /// buffer is drained — partial iteration past that point is allowed, matching a finite
    /// sequence once cancelled.
    pub async fn recv(&self) -> Option<RawEnvelope> {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled(), if self.receiver.len() == 0 => None,
            (envelope, _should_resume) = self.receiver.pop() => Some(envelope),
        }
    }

    /// Build the deferred offset-store command for a message this runtime delivered. The caller
    /// pushes it onto the same [`outbox_mq_outbox::CommandRegistry`] as its own domain writes so
    /// the offset only advances once that transaction actually commits.
    pub fn commit_command(&self, envelope: &RawEnvelope) -> Option<OffsetCommitCommand> {
        let topic = envelope.topic.clone()?;
        let partition = envelope.partition?;
        let offset = envelope.offset?;
        Some(OffsetCommitCommand::new(self.consumer.clone(), topic, partition, offset))
    }

    /// Stop the fetcher and release the consumer group assignment. Buffered-but-undelivered
    /// messages are dropped; their offsets were never stored, so they are re-delivered on the
    /// next subscribe.
    pub async fn cancel(self) {
        self.cancellation.cancel();
        let _ = self.fetcher_handle.await;
        self.consumer.unsubscribe();
    }
}
