//! Error types for the consumer runtime.

use thiserror::Error;

pub type ConsumerResult<T> = Result<T, ConsumerError>;

#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("fetcher task ended unexpectedly")]
    FetcherClosed,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
