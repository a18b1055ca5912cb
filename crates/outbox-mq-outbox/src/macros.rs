//! Convenience macros for appending a produce command to a [`crate::registry::CommandRegistry`].

/// Build an [`crate::message::OutboxMessage`] and push a [`crate::publish::ProduceCommand`] onto
/// a registry, inside the caller's own transaction scope.
///
/// # Usage
///
/// ```rust,no_run
/// use outbox_mq_outbox::{enqueue_produce, CommandRegistry, ProduceStrategy, SqlxOutboxRepository, KafkaBrokerPublisher};
/// use outbox_mq_envelope::Headers;
/// use std::sync::Arc;
///
/// # fn example(repository: Arc<SqlxOutboxRepository>, publisher: Arc<KafkaBrokerPublisher>) {
/// let mut registry = CommandRegistry::new();
/// enqueue_produce!(
///     registry,
///     repository.clone(),
///     publisher.clone(),
///     ProduceStrategy::BackgroundOnly,
///     aggregate_id: "order-42".to_string(),
///     topic: "orders.events".to_string(),
///     type_name: "OrderPlaced".to_string(),
///     payload: b"{}".to_vec(),
///     headers: Headers::new(),
/// );
/// # }
/// ```
#[macro_export]
macro_rules! enqueue_produce {
    (
        $registry:expr,
        $repository:expr,
        $publisher:expr,
        $strategy:expr,
        aggregate_id: $aggregate_id:expr,
        topic: $topic:expr,
        type_name: $type_name:expr,
        payload: $payload:expr,
        headers: $headers:expr $(,)?
    ) => {{
        let message = $crate::OutboxMessage::new($aggregate_id, $topic, $type_name, $payload, $headers);
        $registry.push($crate::ProduceCommand::new(message, $strategy, $repository, $publisher));
    }};
}

#[cfg(test)]
mod tests {
    // Macro correctness is checked at compile time by the doctest above.
}
