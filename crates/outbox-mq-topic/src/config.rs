//! `TopicConfig<T>` and the builder that assembles it once at startup.
//!
//! A builder collects per-type configuration — name, key/header extraction, serializer, producer
//! strategy, consumer filters and dedup key — and freezes it into a `TopicConfig<T>` that runtime
//! components (the producer dispatcher, the consumer runtime, the outbox worker's type dispatch
//! table) read through [`crate::registry::TopicRegistry`] rather than re-deriving per call.

use std::collections::HashMap;
use std::sync::Arc;

use outbox_mq_consumer::BackpressureConfig;
use outbox_mq_envelope::{Headers, Serializer};
use outbox_mq_middleware::RetryConfig;
use outbox_mq_outbox::ProduceStrategy;

type KeyExtractor<T> = Arc<dyn Fn(&T) -> Option<String> + Send + Sync>;
type HeaderExtractor<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;
type DedupExtractor<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Producer-side settings frozen onto a [`TopicConfig`].
pub struct ProducerSettings {
    pub outbox_strategy: ProduceStrategy,
    pub retry: Option<RetryConfig>,
}

/// Consumer-side settings frozen onto a [`TopicConfig`].
pub struct ConsumerSettings<T> {
    pub header_filters: HashMap<String, String>,
    pub dedup_extractor: Option<DedupExtractor<T>>,
    pub backpressure: BackpressureConfig,
}

/// Immutable per-type topic metadata. Built once by [`TopicConfigBuilder::build`] and never
/// mutated afterward — runtime components hold an `Arc<TopicConfig<T>>` and read from it
/// concurrently without locking.
pub struct TopicConfig<T> {
    pub name: String,
    key_extractor: Option<KeyExtractor<T>>,
    header_extractors: Vec<(String, HeaderExtractor<T>)>,
    serializer: Arc<dyn Serializer<T>>,
    pub producer: ProducerSettings,
    pub consumer: ConsumerSettings<T>,
}

impl<T> TopicConfig<T> {
    /// The partition key for `message`, or `None` to let the broker client pick.
    pub fn key_for(&self, message: &T) -> Option<String> {
        self.key_extractor.as_ref().and_then(|f| f(message))
    }

    /// Extra headers this topic stamps on every produced message, in configured order.
    pub fn extra_headers_for(&self, message: &T) -> Headers {
        let mut headers = Headers::new();
        for (name, extractor) in &self.header_extractors {
            headers.insert(name.clone(), extractor(message));
        }
        headers
    }

    pub fn serializer(&self) -> &Arc<dyn Serializer<T>> {
        &self.serializer
    }

    /// The dedup value the inbox should fingerprint this message by, if this topic has inbox
    /// deduplication configured.
    pub fn dedup_value_for(&self, message: &T) -> Option<String> {
        self.consumer.dedup_extractor.as_ref().map(|f| f(message))
    }
}

/// Collects per-type configuration and freezes it into a [`TopicConfig`].
///
/// ```rust
/// use outbox_mq_topic::TopicConfigBuilder;
/// use outbox_mq_envelope::JsonSerializer;
/// use outbox_mq_outbox::ProduceStrategy;
///
/// struct OrderPlaced { order_id: String, region: String }
///
/// let config = TopicConfigBuilder::new(JsonSerializer::<OrderPlaced>::new("OrderPlaced"))
///     .name("orders.events")
///     .key_from(|m: &OrderPlaced| Some(m.order_id.clone()))
///     .header("region", |m: &OrderPlaced| m.region.clone())
///     .outbox(ProduceStrategy::BackgroundOnly)
///     .filter("region", "eu")
///     .inbox(|m: &OrderPlaced| m.order_id.clone())
///     .build();
///
/// assert_eq!(config.name, "orders.events");
/// ```
pub struct TopicConfigBuilder<T> {
    name: Option<String>,
    key_extractor: Option<KeyExtractor<T>>,
    header_extractors: Vec<(String, HeaderExtractor<T>)>,
    serializer: Arc<dyn Serializer<T>>,
    outbox_strategy: ProduceStrategy,
    retry: Option<RetryConfig>,
    header_filters: HashMap<String, String>,
    dedup_extractor: Option<DedupExtractor<T>>,
    backpressure: BackpressureConfig,
}

impl<T> TopicConfigBuilder<T> {
    pub fn new(serializer: impl Serializer<T> + 'static) -> Self {
        Self {
            name: None,
            key_extractor: None,
            header_extractors: Vec::new(),
            serializer: Arc::new(serializer),
            outbox_strategy: ProduceStrategy::BackgroundOnly,
            retry: None,
            header_filters: HashMap::new(),
            dedup_extractor: None,
            backpressure: BackpressureConfig::default(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn key_from(mut self, f: impl Fn(&T) -> Option<String> + Send + Sync + 'static) -> Self {
        self.key_extractor = Some(Arc::new(f));
        self
    }

    pub fn header(mut self, name: impl Into<String>, f: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        self.header_extractors.push((name.into(), Arc::new(f)));
        self
    }

    /// Producer dispatch strategy — how a `produce` call turns into broker delivery.
    pub fn outbox(mut self, strategy: ProduceStrategy) -> Self {
        self.outbox_strategy = strategy;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Add a header filter the consumer chain must match for this message to reach the handler.
    /// Calling this repeatedly ANDs the filters together.
    pub fn filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header_filters.insert(name.into(), value.into());
        self
    }

    /// Enable inbox deduplication for this topic, fingerprinting on the value `f` extracts from
    /// each consumed message.
    pub fn inbox(mut self, f: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        self.dedup_extractor = Some(Arc::new(f));
        self
    }

    pub fn backpressure(mut self, config: BackpressureConfig) -> Self {
        self.backpressure = config;
        self
    }

    /// Freeze the collected settings. Defaults the topic name to `T`'s full path when
    /// [`TopicConfigBuilder::name`] was never called.
    pub fn build(self) -> TopicConfig<T> {
        TopicConfig {
            name: self.name.unwrap_or_else(|| std::any::type_name::<T>().to_string()),
            key_extractor: self.key_extractor,
            header_extractors: self.header_extractors,
            serializer: self.serializer,
            producer: ProducerSettings { outbox_strategy: self.outbox_strategy, retry: self.retry },
            consumer: ConsumerSettings {
                header_filters: self.header_filters,
                dedup_extractor: self.dedup_extractor,
                backpressure: self.backpressure,
            },
        }
    }
}
