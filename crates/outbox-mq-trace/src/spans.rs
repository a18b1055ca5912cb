//! Span creation for the produce/consume boundary, linked to W3C trace context carried in
//! envelope headers.

use opentelemetry::global;
use outbox_mq_envelope::Headers;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::propagation::{HeadersExtractor, HeadersInjector};

/// Writes the current span's trace context into `headers` as `traceparent`/`tracestate`, if an
/// active span exists. A no-op on an orphan span (nothing to propagate).
pub fn inject_current_context(headers: &mut Headers) {
    let context = Span::current().context();
    global::get_text_map_propagator(|propagator| propagator.inject_context(&context, &mut HeadersInjector(headers)));
}

/// Starts a produce span and links it to the current active span.
pub fn produce_span(topic: &str) -> Span {
    let span = tracing::info_span!("outbox_mq.produce", topic, otel.kind = "producer");
    span.set_parent(Span::current().context());
    span
}

/// Starts a consume span, parented to the `traceparent` found in `headers` if valid; otherwise
/// an orphan root span.
pub fn consume_span(topic: &str, headers: &Headers) -> Span {
    let parent_context =
        global::get_text_map_propagator(|propagator| propagator.extract(&HeadersExtractor(headers)));

    let span = tracing::info_span!("outbox_mq.consume", topic, otel.kind = "consumer");
    span.set_parent(parent_context);
    span
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_span_without_traceparent_is_a_root_span() {
        let headers = Headers::new();
        let span = consume_span("orders.events", &headers);
        assert!(!span.is_disabled());
    }

    #[test]
    fn consume_span_extracts_valid_traceparent() {
        let headers = Headers::new().with(
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
        );
        let span = consume_span("orders.events", &headers);
        assert!(!span.is_disabled());
    }
}
