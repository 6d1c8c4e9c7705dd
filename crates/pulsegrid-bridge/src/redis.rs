//! Redis-backed bridge implementation.
//!
//! Values are UTF-8 JSON blobs under plain string keys (`GET`/`SET`); no
//! type beyond valid-or-invalid JSON is enforced here. The connection is a
//! single multiplexed async connection — the loop is sequential, so there
//! is never more than one command in flight.

use ::redis::AsyncCommands;
use ::redis::aio::MultiplexedConnection;
use async_trait::async_trait;
use pulse_core::MetricsResult;
use tracing::{debug, error, info};

use crate::error::{BridgeError, BridgeResult};
use crate::KeyValueBridge;

/// Bridge to a live Redis instance.
pub struct RedisBridge {
    conn: MultiplexedConnection,
    addr: String,
}

impl RedisBridge {
    /// Connect to the store. Failure here is startup-fatal for the host;
    /// nothing else in the bridge returns an error.
    pub async fn connect(host: &str, port: u16) -> BridgeResult<Self> {
        let addr = format!("{host}:{port}");
        let client =
            ::redis::Client::open(format!("redis://{addr}/")).map_err(|e| BridgeError::Address {
                addr: addr.clone(),
                detail: e.to_string(),
            })?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| BridgeError::Connect {
                addr: addr.clone(),
                detail: e.to_string(),
            })?;
        info!(%addr, "connected to key-value store");
        Ok(Self { conn, addr })
    }
}

#[async_trait]
impl KeyValueBridge for RedisBridge {
    async fn fetch(&mut self, key: &str) -> Option<serde_json::Value> {
        let raw: Option<String> = match self.conn.get(key).await {
            Ok(raw) => raw,
            Err(err) => {
                error!(addr = %self.addr, %key, error = %err, "fetch from store failed");
                return None;
            }
        };
        let raw = match raw {
            Some(raw) => raw,
            None => {
                debug!(%key, "no data under key");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                error!(%key, error = %err, "stored value is not valid JSON");
                None
            }
        }
    }

    async fn store(&mut self, key: &str, value: &MetricsResult) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                error!(%key, error = %err, "result is not serializable, dropping");
                return;
            }
        };
        match self.conn.set::<_, _, ()>(key, payload).await {
            Ok(()) => debug!(%key, "result stored"),
            Err(err) => {
                error!(addr = %self.addr, %key, error = %err, "store to key-value store failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_to_unreachable_store_errors() {
        // Port 1 is never a Redis instance; the connection is refused.
        let result = RedisBridge::connect("127.0.0.1", 1).await;
        assert!(matches!(result, Err(BridgeError::Connect { .. })));
    }
}
