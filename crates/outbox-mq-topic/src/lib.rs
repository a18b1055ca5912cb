//! # Topic configuration
//!
//! A [`config::TopicConfigBuilder`] collects per-type configuration at startup — topic name, key
//! and header extraction, serializer, producer dispatch strategy, consumer header filters and
//! inbox dedup key — and freezes it into an immutable [`config::TopicConfig`]. A
//! [`registry::TopicRegistry`] holds one `TopicConfig<T>` per registered message type; runtime
//! components (the producer dispatcher, the consumer runtime, the outbox worker's type dispatch
//! table) look configuration up through the registry keyed by `T` rather than threading it
//! through their own constructors.

mod config;
mod registry;

pub use config::{ConsumerSettings, ProducerSettings, TopicConfig, TopicConfigBuilder};
pub use registry::{TopicRegistry, TopicRegistryBuilder};
