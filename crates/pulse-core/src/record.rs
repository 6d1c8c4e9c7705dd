//! Record and result mappings.
//!
//! The host imposes no schema on either side of an invocation: the input is
//! whatever JSON object sits under the input key, the output is whatever
//! object map the function returns. Well-known keys (`timestamp`,
//! `cpu_percent-*`, the network/memory counters) are a contract between the
//! deployed function and the downstream consumer, not this layer.

/// A measurement record fetched from the input key.
pub type MetricsRecord = serde_json::Map<String, serde_json::Value>;

/// A function result written to the output key.
pub type MetricsResult = serde_json::Map<String, serde_json::Value>;
