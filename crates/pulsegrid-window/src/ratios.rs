//! Ratio metrics of the deployed function contract.

use pulse_core::{ContextState, MetricsRecord, MetricsResult};
use tracing::warn;

use crate::window::moving_averages;

fn field(record: &MetricsRecord, key: &str, default: f64) -> f64 {
    record.get(key).and_then(|v| v.as_f64()).unwrap_or(default)
}

/// Share of outgoing traffic in total network traffic, as a percentage.
///
/// Missing counters read as 0; a zero total yields 0.0 rather than a
/// division by zero.
pub fn percent_network_egress(record: &MetricsRecord) -> f64 {
    let sent = field(record, "net_io_counters_eth0-bytes_sent", 0.0);
    let received = field(record, "net_io_counters_eth0-bytes_recv", 0.0);
    let total = sent + received;
    if total == 0.0 {
        warn!("total network bytes is zero, reporting 0% egress");
        return 0.0;
    }
    sent / total * 100.0
}

/// Share of memory holding cached or buffered content, as a percentage.
///
/// Missing cached/buffer counters read as 0; a missing total reads as 1.
pub fn percent_memory_cache(record: &MetricsRecord) -> f64 {
    let cached = field(record, "virtual_memory-cached", 0.0);
    let buffers = field(record, "virtual_memory-buffers", 0.0);
    let total = field(record, "virtual_memory-total", 1.0);
    (cached + buffers) / total * 100.0
}

/// The deployed function's full contract: both ratio metrics plus the
/// per-key moving averages. This is the native statement of what
/// `demos/usermodule.rhai` expresses in script form.
pub fn evaluate(record: &MetricsRecord, state: &mut ContextState) -> MetricsResult {
    let mut result = MetricsResult::new();
    result.insert(
        "percent-network-egress".to_string(),
        percent_network_egress(record).into(),
    );
    result.insert(
        "percent-memory-cache".to_string(),
        percent_memory_cache(record).into(),
    );
    result.extend(moving_averages(record, state));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(entries: &[(&str, serde_json::Value)]) -> MetricsRecord {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn egress_share_of_total_traffic() {
        let input = record(&[
            ("net_io_counters_eth0-bytes_sent", json!(30)),
            ("net_io_counters_eth0-bytes_recv", json!(70)),
        ]);
        assert_eq!(percent_network_egress(&input), 30.0);
    }

    #[test]
    fn egress_with_no_traffic_is_zero_not_nan() {
        assert_eq!(percent_network_egress(&MetricsRecord::new()), 0.0);

        let explicit_zero = record(&[
            ("net_io_counters_eth0-bytes_sent", json!(0)),
            ("net_io_counters_eth0-bytes_recv", json!(0)),
        ]);
        assert_eq!(percent_network_egress(&explicit_zero), 0.0);
    }

    #[test]
    fn memory_cache_share() {
        let input = record(&[
            ("virtual_memory-cached", json!(300)),
            ("virtual_memory-buffers", json!(100)),
            ("virtual_memory-total", json!(1000)),
        ]);
        assert_eq!(percent_memory_cache(&input), 40.0);
    }

    #[test]
    fn memory_cache_defaults_when_fields_missing() {
        // No counters at all: (0 + 0) / 1 * 100 = 0.
        assert_eq!(percent_memory_cache(&MetricsRecord::new()), 0.0);
    }

    #[test]
    fn evaluate_combines_ratios_and_averages() {
        let mut state = ContextState::default();
        let input = record(&[
            ("timestamp", json!("2026-08-04T10:00:00Z")),
            ("net_io_counters_eth0-bytes_sent", json!(30)),
            ("net_io_counters_eth0-bytes_recv", json!(70)),
            ("cpu_percent-0", json!(50.0)),
        ]);

        let result = evaluate(&input, &mut state);
        assert_eq!(result["percent-network-egress"], json!(30.0));
        assert_eq!(result["percent-memory-cache"], json!(0.0));
        assert_eq!(result["avg-util-cpu0-60sec"], json!(50.0));
        assert_eq!(state.history["cpu_percent-0"].len(), 1);
    }
}
