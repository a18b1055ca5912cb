//! The producer/consumer stage chain: small composable steps over a typed envelope, in the
//! spirit of a `tower`-style `Layer`/`Service` pair but shaped around a domain envelope instead of
//! an arbitrary request/response.
//!
//! A disabled stage is never constructed by [`ChainBuilder`] — it is omitted from the chain
//! entirely rather than wrapped in a runtime no-op, so a disabled Retry stage costs nothing.

use std::sync::Arc;

use async_trait::async_trait;
use outbox_mq_envelope::Envelope;
use outbox_mq_errors::ClassifiedError;

pub type StageResult<T> = Result<Envelope<T>, ClassifiedError>;

/// The rest of the chain, as seen from inside a [`Stage`]. Calling `next.run(envelope)` continues
/// to the next stage (or the terminal handler, if this is the last one).
#[async_trait]
pub trait Next<T>: Send + Sync {
    async fn run(&self, envelope: Envelope<T>) -> StageResult<T>;
}

/// One step in a producer or consumer pipeline.
#[async_trait]
pub trait Stage<T>: Send + Sync {
    async fn handle(&self, envelope: Envelope<T>, next: &(dyn Next<T> + Send + Sync)) -> StageResult<T>;
}

/// The terminal step of a chain: the actual broker send or the user's handler invocation.
#[async_trait]
pub trait Terminal<T>: Send + Sync {
    async fn run(&self, envelope: Envelope<T>) -> StageResult<T>;
}

struct TerminalNext<'a, T> {
    terminal: &'a (dyn Terminal<T> + Send + Sync),
}

#[async_trait]
impl<'a, T: Send + 'static> Next<T> for TerminalNext<'a, T> {
    async fn run(&self, envelope: Envelope<T>) -> StageResult<T> {
        self.terminal.run(envelope).await
    }
}

struct Continuation<'a, T> {
    stages: &'a [Arc<dyn Stage<T>>],
    index: usize,
    terminal: &'a (dyn Terminal<T> + Send + Sync),
}

#[async_trait]
impl<'a, T: Send + 'static> Next<T> for Continuation<'a, T> {
    async fn run(&self, envelope: Envelope<T>) -> StageResult<T> {
        match self.stages.get(self.index) {
            Some(stage) => {
                let next = Continuation {
                    stages: self.stages,
                    index: self.index + 1,
                    terminal: self.terminal,
                };
                stage.handle(envelope, &next).await
            }
            None => TerminalNext { terminal: self.terminal }.run(envelope).await,
        }
    }
}

/// An ordered, immutable chain of stages built by [`ChainBuilder`].
pub struct Chain<T> {
    stages: Vec<Arc<dyn Stage<T>>>,
}

impl<T: Send + 'static> Chain<T> {
    pub fn run<'a>(
        &'a self,
        envelope: Envelope<T>,
        terminal: &'a (dyn Terminal<T> + Send + Sync),
    ) -> impl std::future::Future<Output = StageResult<T>> + 'a {
        let cont = Continuation { stages: &self.stages, index: 0, terminal };
        async move { cont.run(envelope).await }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Builds a [`Chain`] one stage at a time. Stages gated on `enabled: false` in a topic's
/// configuration are never pushed, so [`Chain::len`] reflects exactly what runs.
#[derive(Default)]
pub struct ChainBuilder<T> {
    stages: Vec<Arc<dyn Stage<T>>>,
}

impl<T: Send + 'static> ChainBuilder<T> {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn stage(mut self, stage: impl Stage<T> + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Only push `stage` when `enabled` is true. The chain built from this is indistinguishable
    /// from one that never mentioned the stage at all.
    pub fn stage_if(self, enabled: bool, stage: impl Stage<T> + 'static) -> Self {
        if enabled {
            self.stage(stage)
        } else {
            self
        }
    }

    pub fn build(self) -> Chain<T> {
        Chain { stages: self.stages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingStage {
        name: &'static str,
        order: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Stage<u32> for RecordingStage {
        async fn handle(&self, envelope: Envelope<u32>, next: &(dyn Next<u32> + Send + Sync)) -> StageResult<u32> {
            self.order.lock().unwrap().push(self.name);
            next.run(envelope).await
        }
    }

    struct CountingTerminal {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Terminal<u32> for CountingTerminal {
        async fn run(&self, envelope: Envelope<u32>) -> StageResult<u32> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(envelope)
        }
    }

    #[tokio::test]
    async fn runs_stages_in_order_then_terminal() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let chain = ChainBuilder::new()
            .stage(RecordingStage { name: "a", order: order.clone() })
            .stage(RecordingStage { name: "b", order: order.clone() })
            .build();
        let terminal = CountingTerminal { calls: AtomicUsize::new(0) };

        let result = chain.run(Envelope::for_message(1u32), &terminal).await;
        assert!(result.is_ok());
        assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(terminal.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_stage_is_never_pushed() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let chain = ChainBuilder::new()
            .stage_if(false, RecordingStage { name: "skipped", order: order.clone() })
            .stage_if(true, RecordingStage { name: "kept", order: order.clone() })
            .build();
        assert_eq!(chain.len(), 1);

        let terminal = CountingTerminal { calls: AtomicUsize::new(0) };
        chain.run(Envelope::for_message(1u32), &terminal).await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["kept"]);
    }

    #[tokio::test]
    async fn empty_chain_calls_terminal_directly() {
        let chain: Chain<u32> = ChainBuilder::new().build();
        let terminal = CountingTerminal { calls: AtomicUsize::new(0) };
        chain.run(Envelope::for_message(1u32), &terminal).await.unwrap();
        assert_eq!(terminal.calls.load(Ordering::SeqCst), 1);
    }
}
