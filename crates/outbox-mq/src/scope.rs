//! The unit-of-work boundary: a [`Scope`] pairs a connection pool with a
//! [`outbox_mq_outbox::CommandRegistry`] so every `produce` call and every consumer offset commit
//! issued while handling one logical request defers its side effects to the same commit point.
//!
//! A scope is not thread-safe and has exactly one owner — it is built at the start of a request
//! or a message handler, collects commands, and is consumed by [`Scope::commit`].

use outbox_mq_outbox::{CommandRegistry, OutboxResult, ScopedCommand};
use sqlx::PgPool;

/// Bounds one transactional unit of work. Domain code pushes `ScopedCommand`s onto it (a
/// produce call, a consumer offset commit) alongside running its own `sqlx` queries against
/// [`Scope::pool`]; [`Scope::commit`] is the single point where the transaction opens, every
/// command's transactional half runs, the transaction commits, and then every command's
/// post-commit half (broker publish, offset store) runs.
pub struct Scope {
    pool: PgPool,
    registry: CommandRegistry,
}

impl Scope {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, registry: CommandRegistry::new() }
    }

    /// The pool backing this scope, for domain code to run its own writes against — typically
    /// inside the same transaction the registry opens at commit time is not visible to domain
    /// code directly; callers that need to interleave domain writes with outbox inserts in one
    /// transaction should use [`outbox_mq_outbox::OutboxRepository::insert`] inside their own
    /// `sqlx::Transaction` and defer only the post-commit half through this scope.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Defer a command to this scope's commit point.
    pub fn push(&mut self, command: impl ScopedCommand + 'static) {
        self.registry.push(command);
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Run every deferred command's transactional half inside one transaction, commit, then run
    /// every command's post-commit half in the order they were pushed.
    pub async fn commit(self) -> OutboxResult<()> {
        self.registry.commit(&self.pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_scope_is_empty() {
        // PgPool::connect_lazy never touches the network, so this is safe without a live database.
        let pool = PgPool::connect_lazy("postgresql://localhost/outbox_mq_test").unwrap();
        let scope = Scope::new(pool);
        assert!(scope.is_empty());
        assert_eq!(scope.len(), 0);
    }
}
