//! The background polling worker that publishes rows the producer path left behind.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::OutboxResult;
use crate::publish::BrokerPublisher;
use crate::repository::{OutboxRepository, WorkerOwnership};

const MAX_BACKOFF_SECS: u64 = 300;

/// Where to publish a message of a given type tag. Built once at startup from every
/// `Topic<T>` declaration on the host's topic registry, keyed by the outbox row's `type` column.
#[derive(Debug, Clone)]
pub struct TypeRoute {
    /// Topic to publish to. Usually matches the row's own `topic` column, but is read from the
    /// route rather than the row so a redeployed topic rename takes effect without rewriting
    /// rows already queued under the old name.
    pub topic: String,
}

#[derive(Debug, Clone, Default)]
pub struct TypeDispatchTable {
    routes: HashMap<String, TypeRoute>,
}

impl TypeDispatchTable {
    pub fn builder() -> TypeDispatchTableBuilder {
        TypeDispatchTableBuilder::default()
    }

    pub fn route_for(&self, type_name: &str) -> Option<&TypeRoute> {
        self.routes.get(type_name)
    }
}

#[derive(Default)]
pub struct TypeDispatchTableBuilder {
    routes: HashMap<String, TypeRoute>,
}

impl TypeDispatchTableBuilder {
    pub fn register(mut self, type_name: impl Into<String>, topic: impl Into<String>) -> Self {
        self.routes.insert(type_name.into(), TypeRoute { topic: topic.into() });
        self
    }

    pub fn build(self) -> TypeDispatchTable {
        TypeDispatchTable { routes: self.routes }
    }
}

/// Worker lifecycle state. `Stopping` may be entered from any other state; in-flight publishes
/// finish (or abort, if cancellation fired mid-publish) before the loop exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Polling,
    Dispatching,
    Stopping,
}

pub struct WorkerConfig {
    pub polling_interval: Duration,
    pub batch_size: i64,
    pub ownership: WorkerOwnership,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { polling_interval: Duration::from_secs(5), batch_size: 100, ownership: WorkerOwnership::SingleNode }
    }
}

impl WorkerConfig {
    /// Reads `OUTBOX_POLL_INTERVAL_MS` / `OUTBOX_BATCH_SIZE` with a fallback to defaults on a
    /// missing or unparsable value, mirroring the ambient `*_from_env` helpers used elsewhere in
    /// this crate family. `ownership` is left at `SingleNode` — multi-worker partitioning is a
    /// deployment-level decision, not an environment toggle.
    pub fn from_env() -> Self {
        let polling_interval = std::env::var("OUTBOX_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(5));

        let batch_size = std::env::var("OUTBOX_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(100);

        Self { polling_interval, batch_size, ownership: WorkerOwnership::SingleNode }
    }
}

/// Polls, dispatches, and deletes outbox rows. See module docs for the state machine.
pub struct OutboxWorker {
    repository: Arc<dyn OutboxRepository>,
    dispatch: TypeDispatchTable,
    publisher: Arc<dyn BrokerPublisher>,
    config: WorkerConfig,
    metrics: Option<crate::metrics::OutboxMetrics>,
}

impl OutboxWorker {
    pub fn new(
        repository: Arc<dyn OutboxRepository>,
        dispatch: TypeDispatchTable,
        publisher: Arc<dyn BrokerPublisher>,
        config: WorkerConfig,
    ) -> Self {
        Self { repository, dispatch, publisher, config, metrics: None }
    }

    pub fn with_metrics(mut self, metrics: crate::metrics::OutboxMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Runs until `cancellation` fires. Intended to be spawned as a long-lived background task.
    pub async fn run(&self, cancellation: CancellationToken) {
        info!(
            poll_interval_secs = self.config.polling_interval.as_secs(),
            batch_size = self.config.batch_size,
            "outbox worker starting"
        );

        loop {
            if cancellation.is_cancelled() {
                info!("outbox worker stopping");
                return;
            }

            match self.poll_and_dispatch(&cancellation).await {
                Ok(count) if count > 0 => info!(published = count, "outbox worker published rows"),
                Ok(_) => debug!("outbox worker found nothing pending"),
                Err(e) => error!(error = ?e, "outbox worker poll cycle failed"),
            }

            if cancellation.is_cancelled() {
                info!("outbox worker stopping");
                return;
            }

            if let Some(metrics) = &self.metrics {
                if let Ok((pending, age)) = self.repository.pending_stats().await {
                    metrics.pending.set(pending);
                    metrics.oldest_pending_age_seconds.set(age);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.polling_interval) => {}
                _ = cancellation.cancelled() => {
                    info!("outbox worker stopping mid-sleep");
                    return;
                }
            }
        }
    }

    /// One `Idle -> Polling -> Dispatching -> Idle` cycle. Returns the number of rows published.
    ///
    /// The per-row backoff wait races against `cancellation` so a row with a high `retry_count`
    /// (up to [`MAX_BACKOFF_SECS`]) never blocks the loop from reacting to a stop request, and
    /// never starves the rows behind it in the batch beyond that same wait.
    async fn poll_and_dispatch(&self, cancellation: &CancellationToken) -> OutboxResult<i32> {
        let rows = self.repository.get_pending(self.config.ownership, self.config.batch_size).await?;
        let mut published = 0;

        for row in rows {
            if cancellation.is_cancelled() {
                break;
            }

            let route = match self.dispatch.route_for(&row.type_name) {
                Some(route) => route,
                None => {
                    warn!(type_name = %row.type_name, id = %row.id, "no dispatch route for outbox row, leaving in place");
                    continue;
                }
            };

            let backoff = calculate_backoff(row.retry_count);
            if backoff.as_secs() > 0 {
                tokio::select! {
                    _ = tokio::time::sleep(backoff) => {}
                    _ = cancellation.cancelled() => {
                        debug!(id = %row.id, "outbox worker backoff wait cancelled, leaving row for next run");
                        break;
                    }
                }
            }

            match self.publisher.publish(&route.topic, Some(&row.aggregate_id), &row.payload, &row.headers).await {
                Ok(()) => {
                    if let Err(e) = self.repository.delete(row.id).await {
                        error!(id = %row.id, error = ?e, "published row but failed to delete it");
                    } else {
                        published += 1;
                        if let Some(metrics) = &self.metrics {
                            metrics.published.inc();
                        }
                    }
                }
                Err(e) => {
                    warn!(id = %row.id, error = ?e, "outbox worker publish failed, will retry next poll");
                    if let Err(mark_err) = self.repository.mark_failed(row.id, &e.to_string()).await {
                        error!(id = %row.id, error = ?mark_err, "failed to record publish failure");
                    }
                }
            }
        }

        Ok(published)
    }
}

/// 2^retry_count seconds, capped at [`MAX_BACKOFF_SECS`].
fn calculate_backoff(retry_count: i32) -> Duration {
    let secs = 2u64.saturating_pow(retry_count.max(0) as u32).min(MAX_BACKOFF_SECS);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_exponentially_then_caps() {
        assert_eq!(calculate_backoff(0).as_secs(), 1);
        assert_eq!(calculate_backoff(3).as_secs(), 8);
        assert_eq!(calculate_backoff(10).as_secs(), MAX_BACKOFF_SECS);
    }

    #[test]
    fn dispatch_table_looks_up_by_type_name() {
        let table = TypeDispatchTable::builder().register("OrderPlaced", "orders.events").build();
        assert_eq!(table.route_for("OrderPlaced").unwrap().topic, "orders.events");
        assert!(table.route_for("Unregistered").is_none());
    }
}
