//! Error types for the key-value bridge.

use thiserror::Error;

/// Result type alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors that can escape the bridge. Only connecting is fallible; per-key
/// operations swallow their failures by contract.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid store address {addr}: {detail}")]
    Address { addr: String, detail: String },

    #[error("failed to connect to key-value store at {addr}: {detail}")]
    Connect { addr: String, detail: String },
}
