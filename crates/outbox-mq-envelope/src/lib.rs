//! Typed envelope, ordered header map, and serializer contract shared by every producer and
//! consumer stage in the outbox-mq crate family.

mod envelope;
mod error;
mod headers;
mod serializer;

pub use envelope::Envelope;
pub use error::{SerializerError, SerializerResult};
pub use headers::{Headers, RUNTIME_TYPE_HEADER, TRACEPARENT_HEADER, TRACESTATE_HEADER, TYPE_HEADER};
pub use serializer::{JsonSerializer, Serializer};
