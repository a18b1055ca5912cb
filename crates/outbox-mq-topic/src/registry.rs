//! The immutable, startup-built lookup from a message type to its [`TopicConfig`].
//!
//! Runtime components never hold a `TopicConfig<T>` directly threaded through their
//! constructors — they hold an `Arc<TopicRegistry>` and look up `TopicConfig<T>` by `T` on each
//! call, the same way the outbox worker's type dispatch table looks up a topic by the row's
//! `type` column rather than by a statically known type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::TopicConfig;

/// Collects one [`TopicConfig`] per message type and freezes them into a [`TopicRegistry`].
#[derive(Default)]
pub struct TopicRegistryBuilder {
    configs: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl TopicRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the configuration for message type `T`. Registering the same `T` twice replaces
    /// the earlier configuration.
    pub fn register<T: Send + Sync + 'static>(mut self, config: TopicConfig<T>) -> Self {
        self.configs.insert(TypeId::of::<T>(), Arc::new(config));
        self
    }

    pub fn build(self) -> TopicRegistry {
        TopicRegistry { configs: self.configs }
    }
}

/// Immutable after construction: every topic's configuration is known at startup and never
/// changes for the life of the process.
pub struct TopicRegistry {
    configs: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl TopicRegistry {
    pub fn builder() -> TopicRegistryBuilder {
        TopicRegistryBuilder::new()
    }

    /// The configuration registered for message type `T`, if any.
    pub fn get<T: 'static>(&self) -> Option<Arc<TopicConfig<T>>> {
        self.configs
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.clone().downcast::<TopicConfig<T>>().ok())
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopicConfigBuilder;
    use outbox_mq_envelope::JsonSerializer;

    struct OrderPlaced {
        order_id: String,
    }

    struct ShipmentCreated {
        shipment_id: String,
    }

    #[test]
    fn looks_up_by_registered_type() {
        let registry = TopicRegistry::builder()
            .register(
                TopicConfigBuilder::new(JsonSerializer::<OrderPlaced>::new("OrderPlaced"))
                    .name("orders.events")
                    .build(),
            )
            .register(
                TopicConfigBuilder::new(JsonSerializer::<ShipmentCreated>::new("ShipmentCreated"))
                    .name("shipments.events")
                    .build(),
            )
            .build();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get::<OrderPlaced>().unwrap().name, "orders.events");
        assert_eq!(registry.get::<ShipmentCreated>().unwrap().name, "shipments.events");
    }

    #[test]
    fn unregistered_type_misses() {
        let registry = TopicRegistry::builder().build();
        assert!(registry.get::<OrderPlaced>().is_none());
    }

    #[test]
    fn re_registering_the_same_type_replaces_it() {
        let registry = TopicRegistry::builder()
            .register(TopicConfigBuilder::new(JsonSerializer::<OrderPlaced>::new("OrderPlaced")).name("v1").build())
            .register(TopicConfigBuilder::new(JsonSerializer::<OrderPlaced>::new("OrderPlaced")).name("v2").build())
            .build();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get::<OrderPlaced>().unwrap().name, "v2");
    }
}
