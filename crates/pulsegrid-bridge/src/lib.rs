//! pulsegrid-bridge — typed fetch/store over the external key-value store.
//!
//! The bridge is a hard error boundary: `fetch` and `store` translate every
//! store, transport, and decoding failure into a logged no-op so nothing
//! from this layer can crash the execution loop. The only fallible surface
//! is connecting, which the host treats as startup-fatal.
//!
//! Two implementations: [`RedisBridge`] for production and [`MemoryBridge`]
//! for tests.

pub mod error;
pub mod memory;
pub mod redis;

use async_trait::async_trait;
use pulse_core::MetricsResult;

pub use error::{BridgeError, BridgeResult};
pub use memory::MemoryBridge;
pub use self::redis::RedisBridge;

/// Capability seam over the key-value store.
#[async_trait]
pub trait KeyValueBridge: Send {
    /// Decoded value under `key`, or `None` when the key is missing, the
    /// stored blob is not valid JSON, or the store is unreachable. Never
    /// an error.
    async fn fetch(&mut self, key: &str) -> Option<serde_json::Value>;

    /// Serialize `value` and write it under `key`. Serialization and
    /// transport failures are logged and swallowed; a failed store is not
    /// retried — the next tick simply overwrites.
    async fn store(&mut self, key: &str, value: &MetricsResult);
}
