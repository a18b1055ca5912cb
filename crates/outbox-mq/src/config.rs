//! Top-level configuration aggregating each subsystem's own `Config::from_env`, the same
//! fallback-on-parse-failure idiom `db_pool::DbConfig::from_env` uses for its own knobs.
//!
//! There is no dependency-injection container here: a `Config` is a plain struct a binary builds
//! once at startup and threads through by value or by reference.

use std::time::Duration;

use outbox_mq_consumer::ConsumerConfig;
use outbox_mq_outbox::WorkerConfig;

/// Inbox fingerprint retention, read from `INBOX_RETENTION_DAYS` (default 30 days).
fn inbox_retention_from_env() -> Duration {
    let days = std::env::var("INBOX_RETENTION_DAYS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(30);
    Duration::from_secs(days * 24 * 60 * 60)
}

/// Process-wide configuration: the outbox worker's polling settings, the consumer's broker and
/// backpressure settings, and the inbox retention window.
#[derive(Debug, Clone)]
pub struct Config {
    pub worker: WorkerConfig,
    pub consumer: ConsumerConfig,
    pub inbox_retention: Duration,
}

impl Config {
    /// Build a `Config` from environment variables. `brokers`/`group_id`/`topics` are
    /// deployment-specific and must be supplied by the caller, matching
    /// [`ConsumerConfig::from_env`]'s own contract.
    pub fn from_env(brokers: String, group_id: String, topics: Vec<String>) -> Self {
        Self {
            worker: WorkerConfig::from_env(),
            consumer: ConsumerConfig::from_env(brokers, group_id, topics),
            inbox_retention: inbox_retention_from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_falls_back_to_defaults_when_unset() {
        std::env::remove_var("INBOX_RETENTION_DAYS");
        let config = Config::from_env("localhost:9092".into(), "test-group".into(), vec!["t".into()]);
        assert_eq!(config.inbox_retention, Duration::from_secs(30 * 24 * 60 * 60));
    }
}
