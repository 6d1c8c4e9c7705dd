//! Time-bounded retention, full-mean recompute.

use chrono::{DateTime, NaiveDateTime, Utc};
use pulse_core::{ContextState, HistorySample, MetricsRecord, MetricsResult};
use tracing::{debug, warn};

use crate::{TRACKED_PREFIX, window};

/// The measurement's own logical time.
///
/// Parsed from the record's `timestamp` field (ISO-8601, a trailing `Z`
/// stripped first); a missing or malformed timestamp falls back to the
/// current wall clock.
pub fn measurement_time(record: &MetricsRecord) -> DateTime<Utc> {
    let Some(raw) = record.get("timestamp").and_then(|v| v.as_str()) else {
        return Utc::now();
    };
    let trimmed = raw.strip_suffix('Z').unwrap_or(raw);
    match NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(naive) => naive.and_utc(),
        Err(err) => {
            warn!(timestamp = %raw, error = %err, "unparseable measurement timestamp, using wall clock");
            Utc::now()
        }
    }
}

/// Roll one sample into a series: prune everything strictly older than the
/// trailing window (measured from `at`), append `(at, value)`, and return
/// the arithmetic mean of the retained values.
///
/// The cutoff is derived from the current measurement, so the appended
/// sample itself is always retained.
pub fn roll(series: &mut Vec<HistorySample>, at: DateTime<Utc>, value: f64) -> f64 {
    let cutoff = at - window();
    series.retain(|sample| sample.timestamp >= cutoff);
    series.push(HistorySample {
        timestamp: at,
        value,
    });
    mean(series)
}

fn mean(series: &[HistorySample]) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.iter().map(|s| s.value).sum::<f64>() / series.len() as f64
}

/// Compute the trailing moving average for every tracked key in the record.
///
/// For each `cpu_percent-<suffix>` key: the key's history in `state` (absent
/// is equivalent to empty) is rolled forward with the current value
/// (non-numeric values read as 0.0) and the mean is emitted under
/// `avg-util-cpu<suffix>-60sec`. The pruned history is written back under
/// the same key.
pub fn moving_averages(record: &MetricsRecord, state: &mut ContextState) -> MetricsResult {
    let at = measurement_time(record);
    let mut result = MetricsResult::new();

    for (key, raw) in record {
        let Some(suffix) = key.strip_prefix(TRACKED_PREFIX) else {
            continue;
        };
        let value = raw.as_f64().unwrap_or(0.0);
        let series = state.history.entry(key.clone()).or_default();
        let average = roll(series, at, value);
        debug!(metric = %key, average, samples = series.len(), "moving average updated");
        result.insert(format!("avg-util-cpu{suffix}-60sec"), average.into());
    }

    result
}
