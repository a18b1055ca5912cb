//! Consumer-chain stage that only forwards messages whose headers match every configured filter.

use std::collections::HashMap;
use std::marker::PhantomData;

use async_trait::async_trait;
use outbox_mq_envelope::Envelope;
use outbox_mq_middleware::{Next, Stage, StageResult};
use tracing::debug;

/// All configured `(name, value)` pairs must match (AND) for the envelope to reach `next`.
/// A non-matching message is not an error — it short-circuits without calling `next`, and the
/// consumer runtime still advances the offset for it, matching broker delivery semantics for a
/// message that was fetched but filtered.
pub struct HeaderFilterStage<T> {
    filters: HashMap<String, String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> HeaderFilterStage<T> {
    pub fn new(filters: HashMap<String, String>) -> Self {
        Self { filters, _marker: PhantomData }
    }

    fn matches(&self, envelope: &Envelope<T>) -> bool {
        self.filters.iter().all(|(name, value)| envelope.header(name) == Some(value.as_str()))
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> Stage<T> for HeaderFilterStage<T> {
    async fn handle(&self, envelope: Envelope<T>, next: &(dyn Next<T> + Send + Sync)) -> StageResult<T> {
        if self.matches(&envelope) {
            next.run(envelope).await
        } else {
            debug!("envelope did not match header filters, skipping handler");
            Ok(envelope)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbox_mq_errors::ClassifiedError;

    struct RecordingTerminal {
        called: std::sync::Arc<std::sync::atomic::AtomicBool>,
    }

    #[async_trait]
    impl Next<String> for RecordingTerminal {
        async fn run(&self, envelope: Envelope<String>) -> Result<Envelope<String>, ClassifiedError> {
            self.called.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(envelope)
        }
    }

    #[tokio::test]
    async fn forwards_when_all_filters_match() {
        let mut filters = HashMap::new();
        filters.insert("region".to_string(), "eu".to_string());
        let stage = HeaderFilterStage::new(filters);

        let envelope = Envelope::for_message("hi".to_string()).with_header("region", "eu");
        let called = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let terminal = RecordingTerminal { called: called.clone() };

        stage.handle(envelope, &terminal).await.unwrap();
        assert!(called.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn short_circuits_when_a_filter_does_not_match() {
        let mut filters = HashMap::new();
        filters.insert("region".to_string(), "eu".to_string());
        let stage = HeaderFilterStage::new(filters);

        let envelope = Envelope::for_message("hi".to_string()).with_header("region", "us");
        let called = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        let terminal = RecordingTerminal { called: called.clone() };

        stage.handle(envelope, &terminal).await.unwrap();
        assert!(!called.load(std::sync::atomic::Ordering::SeqCst));
    }
}
