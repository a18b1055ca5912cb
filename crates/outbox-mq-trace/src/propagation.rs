//! `Injector`/`Extractor` impls over the envelope's own header map, so trace context rides
//! inside `traceparent`/`tracestate` the same way it rides inside gRPC metadata or HTTP headers
//! elsewhere in this crate family.

use opentelemetry::propagation::{Extractor, Injector};
use outbox_mq_envelope::Headers;

/// Writes `traceparent`/`tracestate` into an envelope's headers.
pub struct HeadersInjector<'a>(pub &'a mut Headers);

impl<'a> Injector for HeadersInjector<'a> {
    fn set(&mut self, key: &str, value: String) {
        self.0.insert(key.to_string(), value);
    }
}

/// Reads `traceparent`/`tracestate` from an envelope's headers.
pub struct HeadersExtractor<'a>(pub &'a Headers);

impl<'a> Extractor for HeadersExtractor<'a> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key)
    }

    fn keys(&self) -> Vec<&str> {
        self.0.iter().map(|(k, _)| k).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injector_writes_into_headers() {
        let mut headers = Headers::new();
        let mut injector = HeadersInjector(&mut headers);
        injector.set("traceparent", "00-a-b-01".to_string());
        assert_eq!(headers.get("traceparent"), Some("00-a-b-01"));
    }

    #[test]
    fn extractor_reads_from_headers() {
        let headers = Headers::new().with("traceparent", "00-a-b-01");
        let extractor = HeadersExtractor(&headers);
        assert_eq!(extractor.get("traceparent"), Some("00-a-b-01"));
        assert!(extractor.keys().contains(&"traceparent"));
    }
}
