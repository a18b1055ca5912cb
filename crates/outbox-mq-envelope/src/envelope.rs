//! The typed envelope threaded through every producer and consumer stage.

use chrono::{DateTime, Utc};

use crate::headers::Headers;

/// A message in flight through the middleware chain.
///
/// On the produce path `message` starts populated and `payload` is empty until the serializer
/// stage runs; on the consume path `payload` starts populated (bytes off the wire) and `message`
/// is `None` until the deserializer stage runs. `topic`, `partition`, `offset`, `timestamp` and
/// `leader_epoch` are only meaningful for envelopes that came off a broker fetch — they're `None`
/// for an envelope still being built for produce.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub message: Option<T>,
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub headers: Headers,
    pub topic: Option<String>,
    pub partition: Option<i32>,
    pub offset: Option<i64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub leader_epoch: Option<i32>,
}

impl<T> Envelope<T> {
    /// Start a produce-path envelope from a typed message. `payload` is filled in by the
    /// serializer stage.
    pub fn for_message(message: T) -> Self {
        Self {
            message: Some(message),
            key: None,
            payload: Vec::new(),
            headers: Headers::new(),
            topic: None,
            partition: None,
            offset: None,
            timestamp: None,
            leader_epoch: None,
        }
    }

    /// Start a consume-path envelope from bytes off the wire. `message` is filled in by the
    /// deserializer stage.
    pub fn from_wire(payload: Vec<u8>, headers: Headers) -> Self {
        Self {
            message: None,
            key: None,
            payload,
            headers,
            topic: None,
            partition: None,
            offset: None,
            timestamp: None,
            leader_epoch: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn into_parts(self) -> (Option<T>, Option<String>, Vec<u8>, Headers) {
        (self.message, self.key, self.payload, self.headers)
    }

    pub fn from_parts(message: Option<T>, key: Option<String>, payload: Vec<u8>, headers: Headers) -> Self {
        Self {
            message,
            key,
            payload,
            headers,
            topic: None,
            partition: None,
            offset: None,
            timestamp: None,
            leader_epoch: None,
        }
    }

    /// Map the typed message, keeping every other field (headers, key, broker metadata) intact.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            message: self.message.map(f),
            key: self.key,
            payload: self.payload,
            headers: self.headers,
            topic: self.topic,
            partition: self.partition,
            offset: self.offset,
            timestamp: self.timestamp,
            leader_epoch: self.leader_epoch,
        }
    }
}
