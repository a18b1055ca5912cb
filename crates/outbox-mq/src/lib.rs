//! # outbox-mq
//!
//! Binds a relational database's unit-of-work boundary to a Kafka-like broker: a
//! [`scope::Scope`] carries a [`outbox_mq_outbox::CommandRegistry`] through a request or a
//! message handler, [`dispatcher::ProducerDispatcher`] turns a typed `produce` call into a
//! deferred command per topic configuration, [`consumer_pipeline::ConsumerPipeline`] runs the
//! symmetric deserialize/filter/dedup/trace-extract chain over every fetched envelope before a
//! handler ever sees it, and [`config::Config`] aggregates every subsystem's own `from_env()`
//! constructor into one process-wide settings struct.
//!
//! The pieces this crate assembles live in their own focused crates and are re-exported here:
//!
//! - [`outbox_mq_envelope`] — the typed envelope, header map, and serializer contract.
//! - [`outbox_mq_errors`] — the cross-cutting fatal/transient error classification.
//! - [`outbox_mq_middleware`] — the producer/consumer stage chain and resilience primitives.
//! - [`outbox_mq_inbox`] — the deduplicating inbox.
//! - [`outbox_mq_outbox`] — the transactional outbox store, command registry, and polling worker.
//! - [`outbox_mq_consumer`] — the backpressured consumer runtime and offset commit command.
//! - [`outbox_mq_trace`] — W3C trace propagation and cross-cutting counters.
//! - [`outbox_mq_topic`] — per-type topic configuration and its startup registry.
//!
//! `.sql` migrations for `outbox_messages`/`inbox_messages` ship under this crate's
//! `migrations/` directory for `sqlx::migrate!` to embed; this crate does not reimplement a
//! migration runner.

mod config;
mod consumer_pipeline;
mod dispatcher;
mod scope;

pub use config::Config;
pub use consumer_pipeline::ConsumerPipeline;
pub use dispatcher::ProducerDispatcher;
pub use scope::Scope;

pub use outbox_mq_consumer::{
    BackpressureConfig, BackpressureMode, ConsumerConfig, ConsumerError, ConsumerResult,
    ConsumerRuntime, HeaderFilterStage, OffsetCommitCommand, RawEnvelope,
};
pub use outbox_mq_envelope::{
    Envelope, Headers, JsonSerializer, Serializer, SerializerError, SerializerResult,
    RUNTIME_TYPE_HEADER, TRACEPARENT_HEADER, TRACESTATE_HEADER, TYPE_HEADER,
};
pub use outbox_mq_errors::{ClassifiedError, Severity};
pub use outbox_mq_inbox::{InboxError, InboxGuard, InboxMessage, InboxResult, ProcessingResult};
pub use outbox_mq_middleware::{
    Chain, ChainBuilder, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState,
    Next, RetryConfig, RetryError, Stage, StageResult, Terminal, ThrottleConfig, ThrottleStage,
};
pub use outbox_mq_outbox::{
    BrokerPublisher, CommandRegistry, KafkaBrokerPublisher, OutboxError, OutboxMessage,
    OutboxRepository, OutboxResult, OutboxWorker, ProduceCommand, ProduceStrategy, ScopedCommand,
    SqlxOutboxRepository, TypeDispatchTable, TypeRoute, WorkerConfig, WorkerOwnership, WorkerState,
};
pub use outbox_mq_topic::{ConsumerSettings, ProducerSettings, TopicConfig, TopicConfigBuilder, TopicRegistry, TopicRegistryBuilder};
pub use outbox_mq_trace::{consume_span, produce_span, HeadersExtractor, HeadersInjector, TraceMetrics};
