//! The scoped command registry: a per-transaction buffer of deferred work, drained on commit.
//!
//! A `produce` call does not touch the broker — it appends a [`ScopedCommand`] to the registry
//! bound to the current scope. When the scope's transaction is about to commit, the registry
//! runs every command's [`ScopedCommand::execute_in_transaction`] inside that same transaction
//! (so outbox-row inserts land atomically with domain writes), commits, then runs each
//! command's [`ScopedCommand::after_commit`] outside the transaction — this is where a direct
//! broker publish attempt belongs, since network I/O must never extend the transaction.
//!
//! The registry is not thread-safe: one scope has exactly one owner, consistent with the rest
//! of this crate family's single-task-per-scope model.

use async_trait::async_trait;
use smallvec::SmallVec;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::OutboxResult;

/// Inline capacity before the registry's backing buffer grows onto the heap. Most scopes issue
/// a handful of produce/commit calls.
const INLINE_CAPACITY: usize = 4;

#[async_trait]
pub trait ScopedCommand: Send + Sync {
    /// Runs inside the scope's transaction. Must not perform network I/O.
    async fn execute_in_transaction(&self, tx: &mut Transaction<'_, Postgres>) -> OutboxResult<()>;

    /// Runs after the transaction has committed. Default is a no-op for commands whose entire
    /// effect is the transactional write (e.g. `BackgroundOnly` produce).
    async fn after_commit(&self) -> OutboxResult<()> {
        Ok(())
    }
}

/// FIFO buffer of commands accumulated during one scope.
#[derive(Default)]
pub struct CommandRegistry {
    commands: SmallVec<[Box<dyn ScopedCommand>; INLINE_CAPACITY]>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self { commands: SmallVec::new() }
    }

    pub fn push(&mut self, command: impl ScopedCommand + 'static) {
        self.commands.push(Box::new(command));
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drain the registry: open a transaction, run every command's transactional half in FIFO
    /// order, commit, then run every command's post-commit half in the same order.
    pub async fn commit(self, pool: &PgPool) -> OutboxResult<()> {
        let mut tx = pool.begin().await?;
        for command in &self.commands {
            command.execute_in_transaction(&mut tx).await?;
        }
        tx.commit().await?;

        for command in &self.commands {
            command.after_commit().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingCommand {
        in_tx: Arc<AtomicUsize>,
        after: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ScopedCommand for CountingCommand {
        async fn execute_in_transaction(&self, _tx: &mut Transaction<'_, Postgres>) -> OutboxResult<()> {
            self.in_tx.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn after_commit(&self) -> OutboxResult<()> {
            self.after.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn inline_buffer_holds_few_commands_without_growing() {
        let mut registry = CommandRegistry::new();
        let in_tx = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));

        for _ in 0..INLINE_CAPACITY {
            registry.push(CountingCommand { in_tx: in_tx.clone(), after: after.clone() });
        }

        assert_eq!(registry.len(), INLINE_CAPACITY);
        assert!(!registry.commands.spilled());
    }

    #[test]
    fn growing_past_inline_capacity_spills_to_heap() {
        let mut registry = CommandRegistry::new();
        let in_tx = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));

        for _ in 0..(INLINE_CAPACITY + 1) {
            registry.push(CountingCommand { in_tx: in_tx.clone(), after: after.clone() });
        }

        assert!(registry.commands.spilled());
    }
}
