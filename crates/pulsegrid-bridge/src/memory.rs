//! In-memory bridge (for testing).
//!
//! Stores raw strings so malformed-payload paths are exercisable without a
//! live store.

use std::collections::HashMap;

use async_trait::async_trait;
use pulse_core::MetricsResult;
use tracing::{debug, error};

use crate::KeyValueBridge;

/// HashMap-backed bridge with the same error-swallowing contract as
/// [`crate::RedisBridge`].
#[derive(Debug, Default)]
pub struct MemoryBridge {
    entries: HashMap<String, String>,
}

impl MemoryBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an arbitrary payload, valid JSON or not.
    pub fn put_raw(&mut self, key: &str, raw: &str) {
        self.entries.insert(key.to_string(), raw.to_string());
    }

    /// Raw payload under `key`, if any.
    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Drop the payload under `key`.
    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

#[async_trait]
impl KeyValueBridge for MemoryBridge {
    async fn fetch(&mut self, key: &str) -> Option<serde_json::Value> {
        let raw = match self.entries.get(key) {
            Some(raw) => raw,
            None => {
                debug!(%key, "no data under key");
                return None;
            }
        };
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(err) => {
                error!(%key, error = %err, "stored value is not valid JSON");
                None
            }
        }
    }

    async fn store(&mut self, key: &str, value: &MetricsResult) {
        match serde_json::to_string(value) {
            Ok(payload) => {
                self.entries.insert(key.to_string(), payload);
                debug!(%key, "result stored");
            }
            Err(err) => error!(%key, error = %err, "result is not serializable, dropping"),
        }
    }
}
