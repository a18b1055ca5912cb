//! # Trace propagation
//!
//! Carries W3C trace context inside an envelope's own header map instead of a transport-specific
//! carrier: [`propagation::HeadersInjector`]/[`propagation::HeadersExtractor`] implement
//! `opentelemetry::propagation::{Injector, Extractor}` the same way this crate family's gRPC/HTTP
//! interceptors implement them over metadata maps and header maps. [`spans::produce_span`] and
//! [`spans::consume_span`] create the span on each side and link it via
//! `tracing_opentelemetry::OpenTelemetrySpanExt`.
//!
//! Exporter wiring (where spans ship to — OTLP, Jaeger, etc.) is out of scope: this crate only
//! propagates context and creates spans.

mod metrics;
mod propagation;
mod spans;

pub use metrics::{TraceMetrics, DEFAULT};
pub use propagation::{HeadersExtractor, HeadersInjector};
pub use spans::{consume_span, inject_current_context, produce_span};
