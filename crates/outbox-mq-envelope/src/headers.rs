//! Ordered, string-to-string header map carried by every envelope.
//!
//! Insertion order matters: the producer chain appends `$type` before tracing headers before
//! user headers, and a consumer reading the same envelope back off the wire should see that same
//! order. `IndexMap` gives us that without reaching for a `Vec<(String, String)>` and hand-rolling
//! lookup.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Framework-reserved header carrying the serializer's type tag for a message.
pub const TYPE_HEADER: &str = "$type";

/// Framework-reserved header carrying the concrete runtime type, when it differs from the
/// statically configured topic type (e.g. a base class serialized through a subtype).
pub const RUNTIME_TYPE_HEADER: &str = "$runtimeType";

/// W3C trace context headers, injected/extracted by the tracing stage.
pub const TRACEPARENT_HEADER: &str = "traceparent";
pub const TRACESTATE_HEADER: &str = "tracestate";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(IndexMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Builder-style variant of [`Headers::insert`] for fluent construction.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The serializer's type tag, preferring `$runtimeType` over `$type` when both are present.
    pub fn type_tag(&self) -> Option<&str> {
        self.get(RUNTIME_TYPE_HEADER).or_else(|| self.get(TYPE_HEADER))
    }
}

impl From<IndexMap<String, String>> for Headers {
    fn from(map: IndexMap<String, String>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(IndexMap::from_iter(iter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let headers = Headers::new().with("$type", "OrderPlaced").with("correlationId", "abc");
        let keys: Vec<_> = headers.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["$type", "correlationId"]);
    }

    #[test]
    fn type_tag_prefers_runtime_type() {
        let headers = Headers::new()
            .with(TYPE_HEADER, "Shape")
            .with(RUNTIME_TYPE_HEADER, "Circle");
        assert_eq!(headers.type_tag(), Some("Circle"));
    }

    #[test]
    fn round_trips_through_json() {
        let headers = Headers::new().with("a", "1").with("b", "2");
        let json = serde_json::to_string(&headers).unwrap();
        let back: Headers = serde_json::from_str(&json).unwrap();
        assert_eq!(headers, back);
    }
}
