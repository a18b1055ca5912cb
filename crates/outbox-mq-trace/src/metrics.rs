//! Cross-cutting counters and the publish-latency histogram shared across produce/consume paths.
//!
//! `outbox.pending` (the observable gauge for rows still awaiting publish) is registered by
//! [`outbox_mq_outbox::metrics::OutboxMetrics`] rather than duplicated here — the worker already
//! owns that number, this crate only adds the counters/histogram that no single component owns
//! exclusively.

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, Opts};
use tracing::warn;

#[derive(Clone)]
pub struct TraceMetrics {
    pub messages_produced: IntCounter,
    pub messages_consumed: IntCounter,
    pub inbox_duplicates_filtered: IntCounter,
    pub publish_duration: Histogram,
}

impl TraceMetrics {
    pub fn new(service: &str) -> Self {
        let registry = prometheus::default_registry();

        let messages_produced = IntCounter::with_opts(
            Opts::new("messages_produced_total", "Total messages handed to the broker producer")
                .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for messages_produced_total");

        let messages_consumed = IntCounter::with_opts(
            Opts::new("messages_consumed_total", "Total messages delivered to a consumer handler")
                .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for messages_consumed_total");

        let inbox_duplicates_filtered = IntCounter::with_opts(
            Opts::new("inbox_duplicates_filtered_total", "Total messages discarded as already-processed by the inbox")
                .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for inbox_duplicates_filtered_total");

        let publish_duration = Histogram::with_opts(
            HistogramOpts::new("outbox_publish_duration_seconds", "Latency of a single broker publish call")
                .const_label("service", service.to_string()),
        )
        .expect("valid metric opts for outbox_publish_duration_seconds");

        for metric in [
            Box::new(messages_produced.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(messages_consumed.clone()),
            Box::new(inbox_duplicates_filtered.clone()),
            Box::new(publish_duration.clone()),
        ] {
            if let Err(e) = registry.register(metric) {
                warn!("failed to register trace metric: {}", e);
            }
        }

        Self { messages_produced, messages_consumed, inbox_duplicates_filtered, publish_duration }
    }
}

/// Process-wide metrics, initialized lazily on first access under the `"outbox-mq"` service
/// label. Components that already hold a per-instance `TraceMetrics` (constructed with a more
/// specific service name) should prefer that instance; this is a convenient default for call
/// sites that don't plumb one through.
pub static DEFAULT: Lazy<TraceMetrics> = Lazy::new(|| TraceMetrics::new("outbox-mq"));
