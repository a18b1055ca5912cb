//! Typed serializer contract and the default JSON implementation.
//!
//! A `Serializer<T>` is bound to one topic by [`TopicConfig`](../outbox_mq_topic) and never
//! branches on the concrete type at runtime — that's the job of the outbox worker's type-tag
//! dispatch table, which holds one `Box<dyn Serializer<T>>` per registered message type rather
//! than inspecting `TypeId` the way a reflection-based binder would.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

use crate::error::{SerializerError, SerializerResult};
use crate::headers::{Headers, RUNTIME_TYPE_HEADER, TYPE_HEADER};

/// Converts a typed message to and from wire bytes, stamping/reading the `$type` header.
pub trait Serializer<T>: Send + Sync {
    fn serialize(&self, headers: &mut Headers, message: &T) -> SerializerResult<Vec<u8>>;
    fn deserialize(&self, headers: &Headers, payload: &[u8]) -> SerializerResult<T>;

    /// The type tag this serializer stamps on produce and expects on consume.
    fn type_tag(&self) -> &str;
}

/// Default serializer: JSON payload, `$type` header set to a fixed tag.
///
/// Mirrors the polymorphic envelope encoding the teacher's event schema used, but replaces its
/// reflection-driven type resolution with an explicit tag supplied at construction — the tag
/// comes from the topic's type registration, not from inspecting the message's runtime type.
pub struct JsonSerializer<T> {
    type_tag: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonSerializer<T> {
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned + Send + Sync> Serializer<T> for JsonSerializer<T> {
    fn serialize(&self, headers: &mut Headers, message: &T) -> SerializerResult<Vec<u8>> {
        let bytes = serde_json::to_vec(message).map_err(SerializerError::Encode)?;
        if bytes == b"null" {
            return Err(SerializerError::NullPayload);
        }
        headers.insert(TYPE_HEADER, self.type_tag.clone());
        Ok(bytes)
    }

    fn deserialize(&self, headers: &Headers, payload: &[u8]) -> SerializerResult<T> {
        let tag = headers
            .get(RUNTIME_TYPE_HEADER)
            .or_else(|| headers.get(TYPE_HEADER))
            .ok_or(SerializerError::MissingTypeHeader)?;
        if tag != self.type_tag {
            return Err(SerializerError::TypeMismatch {
                expected: self.type_tag.clone(),
                actual: tag.to_string(),
            });
        }
        serde_json::from_slice(payload).map_err(SerializerError::Decode)
    }

    fn type_tag(&self) -> &str {
        &self.type_tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct OrderPlaced {
        order_id: String,
    }

    #[test]
    fn round_trips_through_json() {
        let serializer = JsonSerializer::<OrderPlaced>::new("OrderPlaced");
        let msg = OrderPlaced { order_id: "o-1".into() };
        let mut headers = Headers::new();
        let bytes = serializer.serialize(&mut headers, &msg).unwrap();
        assert_eq!(headers.get(TYPE_HEADER), Some("OrderPlaced"));

        let back = serializer.deserialize(&headers, &bytes).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn missing_type_header_is_fatal() {
        let serializer = JsonSerializer::<OrderPlaced>::new("OrderPlaced");
        let headers = Headers::new();
        let err = serializer.deserialize(&headers, b"{}").unwrap_err();
        assert!(matches!(err, SerializerError::MissingTypeHeader));
    }

    #[test]
    fn mismatched_type_header_is_fatal() {
        let serializer = JsonSerializer::<OrderPlaced>::new("OrderPlaced");
        let headers = Headers::new().with(TYPE_HEADER, "ShipmentCreated");
        let err = serializer.deserialize(&headers, b"{}").unwrap_err();
        assert!(matches!(err, SerializerError::TypeMismatch { .. }));
    }

    #[test]
    fn runtime_type_header_wins_over_type_header() {
        let serializer = JsonSerializer::<OrderPlaced>::new("OrderPlaced");
        let headers = Headers::new()
            .with(TYPE_HEADER, "Base")
            .with(RUNTIME_TYPE_HEADER, "OrderPlaced")
            .with("unused", "x");
        let msg = OrderPlaced { order_id: "o-2".into() };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let back = serializer.deserialize(&headers, &bytes).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn null_message_is_rejected() {
        let serializer = JsonSerializer::<Option<OrderPlaced>>::new("OrderPlaced");
        let mut headers = Headers::new();
        let err = serializer.serialize(&mut headers, &None).unwrap_err();
        assert!(matches!(err, SerializerError::NullPayload));
    }
}
