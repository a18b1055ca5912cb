//! # Transactional outbox
//!
//! Binds a relational transaction to broker delivery: a `produce` call during a transaction
//! only appends a command to a [`CommandRegistry`] (see [`registry`]) bound to that scope — no
//! broker I/O happens yet. When the scope commits, the registry's commands run their
//! transactional half inside the same transaction (so an outbox row lands atomically with the
//! caller's own domain writes), the transaction commits, and then each command's post-commit
//! half runs — this is where a [`ProduceStrategy::ImmediateWithFallback`] fallback publish or a
//! `FireForget`/`AwaitForget` direct publish belongs, since network I/O must never extend the
//! transaction.
//!
//! A background [`OutboxWorker`] polls whatever rows a `BackgroundOnly` or failed
//! `ImmediateWithFallback` produce left behind, publishes them, and deletes each row on success.
//!
//! ## Usage
//!
//! ### 1. Enqueue a produce call inside a transaction scope
//!
//! ```rust,no_run
//! use outbox_mq_outbox::{CommandRegistry, OutboxMessage, ProduceCommand, ProduceStrategy, SqlxOutboxRepository, KafkaBrokerPublisher};
//! use outbox_mq_envelope::Headers;
//! use sqlx::PgPool;
//! use std::sync::Arc;
//!
//! async fn place_order(
//!     pool: &PgPool,
//!     repository: Arc<SqlxOutboxRepository>,
//!     publisher: Arc<KafkaBrokerPublisher>,
//! ) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = CommandRegistry::new();
//!
//!     let message = OutboxMessage::new(
//!         "order-42".to_string(),
//!         "orders.events".to_string(),
//!         "OrderPlaced".to_string(),
//!         br#"{"orderId":"order-42"}"#.to_vec(),
//!         Headers::new(),
//!     );
//!     registry.push(ProduceCommand::new(message, ProduceStrategy::BackgroundOnly, repository, publisher));
//!
//!     // ... domain writes against `pool` go through the same scope ...
//!     registry.commit(pool).await?;
//!     Ok(())
//! }
//! ```
//!
//! ### 2. Run the polling worker
//!
//! ```rust,no_run
//! use outbox_mq_outbox::{OutboxWorker, WorkerConfig, TypeDispatchTable, SqlxOutboxRepository, KafkaBrokerPublisher};
//! use rdkafka::ClientConfig;
//! use sqlx::PgPool;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = PgPool::connect("postgresql://localhost/mydb").await?;
//!     let producer = ClientConfig::new()
//!         .set("bootstrap.servers", "localhost:9092")
//!         .set("enable.idempotence", "true")
//!         .set("acks", "all")
//!         .create()?;
//!
//!     let repository = Arc::new(SqlxOutboxRepository::new(pool));
//!     let publisher = Arc::new(KafkaBrokerPublisher::new(producer));
//!     let dispatch = TypeDispatchTable::builder()
//!         .register("OrderPlaced", "orders.events")
//!         .build();
//!
//!     let worker = OutboxWorker::new(repository, dispatch, publisher, WorkerConfig::from_env());
//!     worker.run(CancellationToken::new()).await;
//!     Ok(())
//! }
//! ```

mod error;
pub mod macros;
mod message;
pub mod metrics;
mod publish;
mod registry;
mod repository;
mod worker;

pub use error::{OutboxError, OutboxResult};
pub use message::OutboxMessage;
pub use publish::{BrokerPublisher, KafkaBrokerPublisher, ProduceCommand, ProduceStrategy};
pub use registry::{CommandRegistry, ScopedCommand};
pub use repository::{OutboxRepository, SqlxOutboxRepository, WorkerOwnership};
pub use worker::{OutboxWorker, TypeDispatchTable, TypeRoute, WorkerConfig, WorkerState};
