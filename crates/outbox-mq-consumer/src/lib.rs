//! # Consumer runtime
//!
//! A single background fetcher task owns the broker consumer handle exclusively and writes
//! fetched messages into a bounded buffer (see [`backpressure`]); [`ConsumerRuntime::recv`]
//! exposes that buffer as a cancellable asynchronous sequence. Offsets are never auto-committed:
//! once a message has been handled, the caller asks this runtime for an
//! [`offset::OffsetCommitCommand`] and pushes it onto the same
//! [`outbox_mq_outbox::CommandRegistry`] scope as its own domain writes, so the offset only
//! advances once that transaction actually commits.
//!
//! [`header_filter::HeaderFilterStage`] is the consumer-chain stage that applies
//! `consumer.headerFilters` — every configured `(name, value)` pair must match for the message to
//! reach the user handler; non-matching messages still flow through to the offset commit.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use outbox_mq_consumer::{ConsumerConfig, ConsumerRuntime};
//! use outbox_mq_outbox::CommandRegistry;
//! use sqlx::PgPool;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = PgPool::connect("postgresql://localhost/mydb").await?;
//!     let config = ConsumerConfig::from_env(
//!         "localhost:9092".to_string(),
//!         "orders-service".to_string(),
//!         vec!["orders.events".to_string()],
//!     );
//!     let runtime = ConsumerRuntime::start(config)?;
//!
//!     while let Some(envelope) = runtime.recv().await {
//!         // deserialize, run the inbox-guarded handler, then commit the offset:
//!         if let Some(command) = runtime.commit_command(&envelope) {
//!             let mut registry = CommandRegistry::new();
//!             registry.push(command);
//!             registry.commit(&pool).await?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod backpressure;
mod error;
mod fetcher;
pub mod header_filter;
mod offset;
mod runtime;

pub use backpressure::{BackpressureConfig, BackpressureMode};
pub use error::{ConsumerError, ConsumerResult};
pub use fetcher::RawEnvelope;
pub use header_filter::HeaderFilterStage;
pub use offset::OffsetCommitCommand;
pub use runtime::{ConsumerConfig, ConsumerRuntime};
