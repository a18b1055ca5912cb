//! Preset resilience configurations for the two kinds of calls this library makes: publishing to
//! the broker and writing to the database that backs the outbox/inbox tables.

use std::time::Duration;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::retry::RetryConfig;
use crate::timeout::TimeoutConfig;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub timeout: TimeoutConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub retry: Option<RetryConfig>,
}

/// Kafka produce calls: should be fast, retried a few times (producer keys make retries safe),
/// and trip the circuit quickly since a stalled broker connection backs up every topic.
pub fn broker_publish_config() -> ServiceConfig {
    ServiceConfig {
        timeout: TimeoutConfig {
            duration: Duration::from_secs(5),
        },
        circuit_breaker: CircuitBreakerConfig {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(30),
            error_rate_threshold: 0.5,
            window_size: 100,
        },
        retry: Some(RetryConfig {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }),
    }
}

/// Outbox/inbox database writes: fast queries, no retry (a retried insert inside an already-open
/// transaction risks a duplicate row), more tolerant error-rate threshold since a few slow
/// queries under load shouldn't trip the breaker as eagerly as a flaky broker does.
pub fn database_write_config() -> ServiceConfig {
    ServiceConfig {
        timeout: TimeoutConfig {
            duration: Duration::from_secs(10),
        },
        circuit_breaker: CircuitBreakerConfig {
            failure_threshold: 10,
            success_threshold: 3,
            timeout: Duration::from_secs(30),
            error_rate_threshold: 0.6,
            window_size: 100,
        },
        retry: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_publish_allows_retry() {
        let config = broker_publish_config();
        assert_eq!(config.timeout.duration, Duration::from_secs(5));
        assert!(config.retry.is_some());
    }

    #[test]
    fn database_write_has_no_retry() {
        let config = database_write_config();
        assert!(config.retry.is_none());
    }
}
