//! Metric records: a provider-attributed numeric value with history.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single metric's recorded values, keyed by fully-qualified name
/// (`<provider>:<name>`, e.g. `mendeley:readers`) at the item level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    pub provenance_url: Option<String>,
    pub values: MetricValues,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricValues {
    pub raw: f64,
    pub raw_history: BTreeMap<DateTime<Utc>, f64>,
}

impl MetricRecord {
    pub fn new(provenance_url: Option<String>, observed_at: DateTime<Utc>, value: f64) -> Self {
        let mut raw_history = BTreeMap::new();
        raw_history.insert(observed_at, value);
        Self {
            provenance_url,
            values: MetricValues {
                raw: value,
                raw_history,
            },
        }
    }

    /// Appends a new observation, always becoming the new `raw` value
    /// because `raw_history` is keyed by timestamp and `raw` mirrors the
    /// most recent entry (invariant 1).
    pub fn record(&mut self, provenance_url: Option<String>, observed_at: DateTime<Utc>, value: f64) {
        self.provenance_url = provenance_url;
        self.values.raw_history.insert(observed_at, value);
        self.values.raw = value;
    }

    /// Confirms the raw/raw_history invariant for tests and debugging.
    pub fn is_consistent(&self) -> bool {
        self.values
            .raw_history
            .values()
            .next_back()
            .map(|last| *last == self.values.raw)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn recording_twice_appends_history_and_updates_raw() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut metric = MetricRecord::new(Some("https://example.org".into()), t0, 10.0);
        metric.record(Some("https://example.org".into()), t1, 15.0);

        assert_eq!(metric.values.raw, 15.0);
        assert_eq!(metric.values.raw_history.len(), 2);
        assert!(metric.is_consistent());
    }
}
