//! The single background task that owns the `StreamConsumer` exclusively and hands fetched
//! messages into the backpressured buffer.

use std::sync::Arc;

use outbox_mq_envelope::{Envelope, Headers};
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message as KafkaMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backpressure::{BackpressureMode, BackpressureSender};

/// A message pulled off the wire, not yet deserialized — that happens in the middleware chain
/// built around this runtime.
pub type RawEnvelope = Envelope<()>;

fn to_raw_envelope(msg: &rdkafka::message::BorrowedMessage<'_>) -> RawEnvelope {
    let mut headers = Headers::new();
    if let Some(kafka_headers) = msg.headers() {
        for header in kafka_headers.iter() {
            if let Some(value) = header.value {
                headers.insert(header.key.to_string(), String::from_utf8_lossy(value).into_owned());
            }
        }
    }

    let payload = msg.payload().map(|p| p.to_vec()).unwrap_or_default();
    let mut envelope = Envelope::<()>::from_wire(payload, headers);
    envelope.topic = Some(msg.topic().to_string());
    envelope.partition = Some(msg.partition());
    envelope.offset = Some(msg.offset());
    envelope.key = msg.key().map(|k| String::from_utf8_lossy(k).into_owned());
    envelope.timestamp = msg
        .timestamp()
        .to_millis()
        .and_then(chrono::DateTime::from_timestamp_millis);
    envelope
}

/// Runs until `cancellation` fires: fetches, converts to [`RawEnvelope`], pushes into `sender`,
/// and pauses/resumes the assignment at the configured watermarks under `ApplyBackpressure`.
pub async fn run(consumer: Arc<StreamConsumer>, sender: BackpressureSender<RawEnvelope>, cancellation: CancellationToken) {
    info!("outbox-mq consumer fetcher starting");
    let mut paused = false;

    loop {
        let msg = tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                info!("outbox-mq consumer fetcher stopping");
                return;
            }
            result = consumer.recv() => result,
        };

        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                error!(error = %e, "kafka fetch error");
                continue;
            }
        };

        let envelope = to_raw_envelope(&msg);
        let over_high_watermark = sender.push(envelope).await;

        if sender.config().mode == BackpressureMode::ApplyBackpressure {
            if over_high_watermark && !paused {
                if let Err(e) = pause_assignment(&consumer) {
                    warn!(error = %e, "failed to pause consumer assignment");
                } else {
                    debug!("paused fetch: buffer above high watermark");
                    paused = true;
                }
            } else if paused && sender.len() <= sender.config().low_watermark() {
                if let Err(e) = resume_assignment(&consumer) {
                    warn!(error = %e, "failed to resume consumer assignment");
                } else {
                    debug!("resumed fetch: buffer below low watermark");
                    paused = false;
                }
            }
        }
    }
}

fn pause_assignment(consumer: &StreamConsumer) -> Result<(), rdkafka::error::KafkaError> {
    let assignment = consumer.assignment()?;
    consumer.pause(&assignment)
}

fn resume_assignment(consumer: &StreamConsumer) -> Result<(), rdkafka::error::KafkaError> {
    let assignment = consumer.assignment()?;
    consumer.resume(&assignment)
}
