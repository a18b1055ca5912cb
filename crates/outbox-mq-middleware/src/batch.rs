//! Coalesces produce calls into groups flushed by size or a linger timer.
//!
//! Unlike the other stages, a `BatchStage` owns its downstream terminal rather than calling the
//! `next` passed to [`Stage::handle`] — batching only makes sense immediately before the terminal
//! producer, so it is built with that terminal already in hand.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use outbox_mq_envelope::Envelope;
use outbox_mq_errors::ClassifiedError;
use tokio::sync::{mpsc, oneshot};

use crate::stage::{Next, Stage, StageResult, Terminal};

#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub max_size: usize,
    pub max_linger: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            max_linger: Duration::from_millis(50),
        }
    }
}

struct PendingItem<T> {
    envelope: Envelope<T>,
    respond_to: oneshot::Sender<StageResult<T>>,
}

pub struct BatchStage<T> {
    sender: mpsc::UnboundedSender<PendingItem<T>>,
}

impl<T: Send + 'static> BatchStage<T> {
    pub fn new(config: BatchConfig, terminal: Arc<dyn Terminal<T> + Send + Sync>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<PendingItem<T>>();

        tokio::spawn(async move {
            while let Some(first) = receiver.recv().await {
                let mut batch = vec![first];
                let deadline = tokio::time::Instant::now() + config.max_linger;

                while batch.len() < config.max_size {
                    match tokio::time::timeout_at(deadline, receiver.recv()).await {
                        Ok(Some(item)) => batch.push(item),
                        Ok(None) | Err(_) => break,
                    }
                }

                for item in batch {
                    let result = terminal.run(item.envelope).await;
                    let _ = item.respond_to.send(result);
                }
            }
        });

        Self { sender }
    }
}

#[async_trait]
impl<T: Send + 'static> Stage<T> for BatchStage<T> {
    async fn handle(&self, envelope: Envelope<T>, _next: &(dyn Next<T> + Send + Sync)) -> StageResult<T> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(PendingItem { envelope, respond_to })
            .map_err(|_| ClassifiedError::transient(anyhow::anyhow!("batch worker has shut down")))?;

        response
            .await
            .map_err(|_| ClassifiedError::transient(anyhow::anyhow!("batch worker dropped response")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::ChainBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTerminal {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Terminal<u32> for CountingTerminal {
        async fn run(&self, envelope: Envelope<u32>) -> StageResult<u32> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(envelope)
        }
    }

    #[tokio::test]
    async fn flushes_on_linger_timeout() {
        let calls = Arc::new(AtomicUsize::new(0));
        let terminal = Arc::new(CountingTerminal { calls: calls.clone() });
        let config = BatchConfig {
            max_size: 10,
            max_linger: Duration::from_millis(20),
        };
        let batch_stage = BatchStage::new(config, terminal);
        let chain = ChainBuilder::new().stage(batch_stage).build();

        let dummy_terminal = DummyTerminal;
        let result = chain.run(Envelope::for_message(1u32), &dummy_terminal).await;
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    struct DummyTerminal;

    #[async_trait]
    impl Terminal<u32> for DummyTerminal {
        async fn run(&self, envelope: Envelope<u32>) -> StageResult<u32> {
            Ok(envelope)
        }
    }
}
