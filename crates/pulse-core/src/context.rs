//! Execution context — the mutable record threaded through every invocation.
//!
//! One `ExecutionContext` is created at process start and lives for the
//! process lifetime. It is exclusively owned by the execution loop and
//! passed `&mut` into the invoked function; its [`ContextState`] is the only
//! channel through which an otherwise stateless invocation model keeps
//! memory across ticks.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sentinel revision when the deployed artifact cannot be stat'ed.
pub const UNKNOWN_REVISION: &str = "unknown";

/// One retained sample of a tracked metric: the measurement's own logical
/// time paired with its value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Per-function state, persisted across ticks inside the context.
///
/// The known sub-namespace is `history`: per-metric-key sample series,
/// append-ordered, pruned by timestamp. Anything else a function stores
/// lands in the flattened open map and round-trips untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextState {
    #[serde(default)]
    pub history: BTreeMap<String, Vec<HistorySample>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ContextState {
    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.extra.is_empty()
    }
}

/// The invocation context.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Key-value store connection identity (immutable after creation).
    pub store_host: String,
    pub store_port: u16,
    /// Logical key names the loop reads from and writes to.
    pub input_key: String,
    pub output_key: Option<String>,
    /// Provenance marker: mtime of the deployed module artifact, or
    /// [`UNKNOWN_REVISION`].
    pub function_revision: String,
    /// Time of the most recent invocation attempt; `None` before the
    /// first tick.
    pub last_execution: Option<DateTime<Utc>>,
    /// Cross-tick function state.
    pub state: ContextState,
}

impl ExecutionContext {
    /// Build the context at startup. The provenance probe is best-effort:
    /// a missing artifact yields the sentinel, never an error.
    pub fn new(
        store_host: impl Into<String>,
        store_port: u16,
        input_key: impl Into<String>,
        output_key: Option<String>,
        module_path: &Path,
    ) -> Self {
        Self {
            store_host: store_host.into(),
            store_port,
            input_key: input_key.into(),
            output_key,
            function_revision: artifact_revision(module_path),
            last_execution: None,
            state: ContextState::default(),
        }
    }

    /// Record an invocation attempt: advance `last_execution` and re-derive
    /// the provenance marker from the deployed artifact.
    pub fn mark_executed(&mut self, module_path: &Path) {
        self.last_execution = Some(Utc::now());
        self.function_revision = artifact_revision(module_path);
    }
}

/// Modification time of the deployed function artifact, formatted
/// `%Y-%m-%d %H:%M:%S`, or [`UNKNOWN_REVISION`] when the probe fails.
pub fn artifact_revision(path: &Path) -> String {
    match std::fs::metadata(path).and_then(|m| m.modified()) {
        Ok(mtime) => DateTime::<Utc>::from(mtime)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        Err(err) => {
            debug!(path = ?path, error = %err, "artifact revision probe failed");
            UNKNOWN_REVISION.to_string()
        }
    }
}
