//! pulsegrid-window — the sliding-window aggregation engine.
//!
//! Turns point-in-time samples into trailing moving averages: per tracked
//! metric key, an append-ordered history of `(timestamp, value)` samples is
//! pruned to the trailing window, the current sample is appended, and the
//! arithmetic mean is recomputed from scratch over what remains. The history
//! lives in the caller-supplied [`ContextState`](pulse_core::ContextState),
//! which is how a stateless invocation model keeps memory across ticks.
//!
//! The crate also carries the ratio metrics of the deployed function
//! contract (network-egress and memory-cache percentages) and
//! [`evaluate`], the composition of both with the moving averages.

pub mod ratios;
pub mod window;

pub use ratios::{evaluate, percent_memory_cache, percent_network_egress};
pub use window::{measurement_time, moving_averages, roll};

/// Trailing retention window, in seconds.
pub const WINDOW_SECS: i64 = 60;

/// Record keys with this prefix are tracked by the window engine.
pub const TRACKED_PREFIX: &str = "cpu_percent-";

/// The retention window as a chrono duration.
pub fn window() -> chrono::Duration {
    chrono::Duration::seconds(WINDOW_SECS)
}
