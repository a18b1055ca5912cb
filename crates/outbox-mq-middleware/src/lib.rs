//! The producer/consumer stage chain and the resilience primitives each stage is built from:
//! retry with exponential backoff, a sliding-window circuit breaker, timeouts, throttling, and
//! batching.
//!
//! [`stage`] defines the domain-shaped `Stage`/`Next`/`Chain` abstraction every producer and
//! consumer pipeline is assembled from; the other modules are standalone resilience primitives a
//! custom stage can wrap around its own call, the same way the upstream `resilience` crate this
//! was grown from exposed them for arbitrary services.

pub mod batch;
pub mod circuit_breaker;
pub mod metrics;
pub mod presets;
pub mod retry;
pub mod stage;
pub mod throttle;
pub mod timeout;

pub use batch::{BatchConfig, BatchStage};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};
pub use presets::{broker_publish_config, database_write_config, ServiceConfig};
pub use retry::{with_retry, RetryConfig, RetryError};
pub use stage::{Chain, ChainBuilder, Next, Stage, StageResult, Terminal};
pub use throttle::{ThrottleConfig, ThrottleStage};
pub use timeout::{with_timeout, with_timeout_result, TimeoutConfig, TimeoutError};
