//! pulse-core — shared types for the PulseGrid host.
//!
//! Everything that crosses a crate boundary lives here: the open
//! record/result mappings exchanged with the key-value store, the
//! [`ExecutionContext`] threaded through every invocation, and
//! [`PackageUri`] resolution for function package artifacts.

pub mod context;
pub mod record;
pub mod source;

pub use context::{ContextState, ExecutionContext, HistorySample, UNKNOWN_REVISION};
pub use record::{MetricsRecord, MetricsResult};
pub use source::PackageUri;
