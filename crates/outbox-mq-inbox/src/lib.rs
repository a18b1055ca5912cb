//! Deduplicating inbox: persistent fingerprint tracking so a message is handled exactly once
//! even across consumer restarts, rebalances, and at-least-once broker redelivery.
//!
//! Each consumed message is identified by a `(typeName, dedupValue)` pair hashed into a single
//! `hashId` (see [`fingerprint`]). The inbox stage checks `inbox_messages` for that fingerprint
//! before the handler runs and records it — in the same transaction as the handler's own writes —
//! immediately after. A separate [`InboxGuard::sweep_expired`] call trims rows past the configured
//! retention window; it is not run automatically, the same way the outbox worker's own upkeep
//! tasks are driven by an external scheduler rather than baked into the hot path.

mod error;
mod fingerprint;

pub use error::{InboxError, InboxResult};
pub use fingerprint::hash_id;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, info, warn};

/// Outcome of [`InboxGuard::process_if_new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingResult {
    /// The message was new; the handler ran and its fingerprint is now recorded.
    Success,
    /// A fingerprint for this `(typeName, dedupValue)` pair was already recorded.
    AlreadyProcessed,
    /// The handler ran but returned an error; no fingerprint was recorded, so a future redelivery
    /// will retry it.
    Failed(String),
}

impl ProcessingResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, ProcessingResult::Success | ProcessingResult::AlreadyProcessed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ProcessingResult::Failed(_))
    }
}

/// A row in `inbox_messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxMessage {
    pub hash_id: i64,
    pub type_name: String,
    pub dedup_value: String,
    pub processed_at: DateTime<Utc>,
    pub metadata: Option<serde_json::Value>,
}

/// Tracks processed message fingerprints in Postgres.
///
/// Cloning is cheap (`PgPool` is an `Arc` internally) — share one guard across consumer tasks.
#[derive(Clone)]
pub struct InboxGuard {
    pool: PgPool,
    retention: Duration,
}

impl InboxGuard {
    pub fn new(pool: PgPool, retention: Duration) -> Self {
        Self { pool, retention }
    }

    /// Check whether `(type_name, dedup_value)` has already been recorded.
    pub async fn is_processed(&self, type_name: &str, dedup_value: &str) -> InboxResult<bool> {
        Self::validate(type_name, dedup_value)?;
        let hash_id = fingerprint::hash_id(type_name, dedup_value) as i64;

        let row = sqlx::query(
            r#"SELECT EXISTS(SELECT 1 FROM inbox_messages WHERE hash_id = $1) AS "exists""#,
        )
        .bind(hash_id)
        .fetch_one(&self.pool)
        .await?;

        let exists: bool = row.try_get("exists")?;
        if exists {
            debug!(hash_id, type_name, "message already in inbox");
        }
        Ok(exists)
    }

    /// Record `(type_name, dedup_value)` as processed within an already-open transaction, so the
    /// inbox row commits atomically with the handler's own domain writes.
    ///
    /// Returns `false` (no-op) if the fingerprint was already present — two concurrent handlers
    /// racing on the same message will have exactly one insert succeed.
    pub async fn mark_processed_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        type_name: &str,
        dedup_value: &str,
        metadata: Option<serde_json::Value>,
    ) -> InboxResult<bool> {
        Self::validate(type_name, dedup_value)?;
        let hash_id = fingerprint::hash_id(type_name, dedup_value) as i64;

        let result = sqlx::query(
            r#"
            INSERT INTO inbox_messages (hash_id, type_name, dedup_value, metadata, processed_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (hash_id) DO NOTHING
            "#,
        )
        .bind(hash_id)
        .bind(type_name)
        .bind(dedup_value)
        .bind(&metadata)
        .execute(&mut **tx)
        .await?;

        let inserted = result.rows_affected() > 0;
        if inserted {
            info!(hash_id, type_name, "message recorded in inbox");
        } else {
            debug!(hash_id, type_name, "duplicate insert suppressed by inbox");
        }
        Ok(inserted)
    }

    /// Same as [`InboxGuard::mark_processed_in_tx`], but opens and commits its own transaction.
    /// Use this when the handler has no transaction of its own to piggyback on.
    pub async fn mark_processed(
        &self,
        type_name: &str,
        dedup_value: &str,
        metadata: Option<serde_json::Value>,
    ) -> InboxResult<bool> {
        let mut tx = self.pool.begin().await?;
        let inserted = self
            .mark_processed_in_tx(&mut tx, type_name, dedup_value, metadata)
            .await?;
        tx.commit().await?;
        Ok(inserted)
    }

    /// Atomic check-then-run-then-mark: runs `f` only if `(type_name, dedup_value)` hasn't been
    /// seen, then records the fingerprint in its own transaction.
    ///
    /// This is the standalone-handler convenience path. A handler that already opens its own
    /// transaction for domain writes should call [`InboxGuard::is_processed`] then
    /// [`InboxGuard::mark_processed_in_tx`] directly so both writes land in one commit.
    pub async fn process_if_new<F, Fut>(
        &self,
        type_name: &str,
        dedup_value: &str,
        f: F,
    ) -> InboxResult<ProcessingResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), anyhow::Error>>,
    {
        if self.is_processed(type_name, dedup_value).await? {
            return Ok(ProcessingResult::AlreadyProcessed);
        }

        match f().await {
            Ok(()) => {
                self.mark_processed(type_name, dedup_value, None).await?;
                Ok(ProcessingResult::Success)
            }
            Err(e) => {
                warn!(type_name, dedup_value, error = ?e, "inbox handler failed");
                Ok(ProcessingResult::Failed(e.to_string()))
            }
        }
    }

    /// Delete fingerprints older than the configured retention window. Call this periodically
    /// from an external scheduler (a cron tick, a dedicated background task) — it is not spawned
    /// automatically by this guard.
    pub async fn sweep_expired(&self) -> InboxResult<u64> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.retention)
                .map_err(|e| InboxError::Other(anyhow::anyhow!("invalid retention duration: {e}")))?;

        let result = sqlx::query("DELETE FROM inbox_messages WHERE processed_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            info!(deleted, %cutoff, "swept expired inbox fingerprints");
        } else {
            debug!("no expired inbox fingerprints to sweep");
        }
        Ok(deleted)
    }

    fn validate(type_name: &str, dedup_value: &str) -> InboxResult<()> {
        if type_name.is_empty() {
            return Err(InboxError::InvalidDedupKey("typeName cannot be empty".into()));
        }
        if dedup_value.is_empty() {
            return Err(InboxError::InvalidDedupKey("dedupValue cannot be empty".into()));
        }
        if type_name.len() + dedup_value.len() > 2048 {
            return Err(InboxError::InvalidDedupKey(format!(
                "combined dedup key too long: {} characters (max 2048)",
                type_name.len() + dedup_value.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_empty_fields() {
        assert!(InboxGuard::validate("OrderPlaced", "order-1").is_ok());
        assert!(matches!(
            InboxGuard::validate("", "order-1").unwrap_err(),
            InboxError::InvalidDedupKey(_)
        ));
        assert!(matches!(
            InboxGuard::validate("OrderPlaced", "").unwrap_err(),
            InboxError::InvalidDedupKey(_)
        ));
    }

    #[test]
    fn validate_rejects_oversized_key() {
        let huge = "x".repeat(3000);
        assert!(matches!(
            InboxGuard::validate("OrderPlaced", &huge).unwrap_err(),
            InboxError::InvalidDedupKey(_)
        ));
    }

    #[test]
    fn processing_result_classifies_ok_vs_failed() {
        assert!(ProcessingResult::Success.is_ok());
        assert!(ProcessingResult::AlreadyProcessed.is_ok());
        assert!(!ProcessingResult::Failed("boom".into()).is_ok());

        assert!(!ProcessingResult::Success.is_failed());
        assert!(ProcessingResult::Failed("boom".into()).is_failed());
    }
}
