use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An event as carried by the channel: an opaque byte body plus string
/// headers attached by the producer.
///
/// The storage layer does not interpret either; headers exist so that
/// interceptors and sinks downstream of the channel can route without
/// deserializing the body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Event {
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Event {
    /// Create an event with an empty header map.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
