//! Error types for envelope serialization.

use thiserror::Error;

/// Result type alias for serializer operations.
pub type SerializerResult<T> = Result<T, SerializerError>;

/// Errors raised while moving a message in or out of the wire payload.
///
/// All variants here are fatal per the middleware chain's error policy (§4.1): a serializer
/// failure is never something a Retry/CircuitBreaker stage should paper over, since retrying an
/// encode of the same malformed value produces the same failure again.
#[derive(Error, Debug)]
pub enum SerializerError {
    /// The message encoded to the JSON literal `null`. Spec-fatal: a null payload on produce is
    /// never valid, so no outbox row is written and the caller sees this synchronously.
    #[error("message serialized to a null payload")]
    NullPayload,

    /// Encoding the message to bytes failed.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// Decoding bytes back into a message failed.
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),

    /// Neither `$runtimeType` nor `$type` was present on a consumed envelope.
    #[error("missing $type header on consumed message")]
    MissingTypeHeader,

    /// The envelope's type tag doesn't match the serializer bound to this topic.
    #[error("type mismatch: expected `{expected}`, got `{actual}`")]
    TypeMismatch { expected: String, actual: String },
}
