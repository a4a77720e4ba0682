//! The provider adapter capability interface (§4.1).

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::alias::AliasSet;
use crate::error::ProviderError;

/// The three ordered phases a provider may participate in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Aliases,
    Biblio,
    Metrics,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Aliases => "aliases",
            Phase::Biblio => "biblio",
            Phase::Metrics => "metrics",
        }
    }
}

/// One metric observation returned by a provider: local name, optional
/// provenance URL, and the numeric value. The worker namespaces the name
/// with the provider's own name before merging (§6 "Metric naming").
#[derive(Debug, Clone, PartialEq)]
pub struct MetricObservation {
    pub name: String,
    pub provenance_url: Option<String>,
    pub value: f64,
}

/// Uniform capability set exposed by every provider plugin.
///
/// A provider is pure with respect to the item document: it receives
/// aliases and returns new data: it never mutates state shared with other
/// providers (§4.1).
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Canonical, lowercase provider name used to namespace metrics and to
    /// key queues (e.g. `"dryad"`, `"mendeley"`, `"pmc"`).
    fn name(&self) -> &'static str;

    fn provides_aliases(&self) -> bool {
        false
    }

    fn provides_biblio(&self) -> bool {
        false
    }

    fn provides_metrics(&self) -> bool {
        false
    }

    /// Declares whether this provider can act on a given alias.
    fn is_relevant_alias(&self, alias: &(String, String)) -> bool;

    async fn aliases(&self, current: &AliasSet) -> Result<AliasSet, ProviderError> {
        let _ = current;
        Err(ProviderError::NotImplemented)
    }

    async fn biblio(&self, current: &AliasSet) -> Result<BTreeMap<String, Value>, ProviderError> {
        let _ = current;
        Err(ProviderError::NotImplemented)
    }

    async fn metrics(&self, current: &AliasSet) -> Result<Vec<MetricObservation>, ProviderError> {
        let _ = current;
        Err(ProviderError::NotImplemented)
    }

    /// `-1` means retry indefinitely.
    fn max_retries(&self) -> i64 {
        5
    }

    /// Sleep duration before the `error_count`-th retry. Exponential with a
    /// cap by default; providers with stricter rate limits override this.
    fn sleep_time(&self, error_count: u32) -> Duration {
        let capped = error_count.min(6);
        Duration::from_millis(250 * 2u64.pow(capped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub;

    #[async_trait]
    impl ProviderAdapter for Stub {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn is_relevant_alias(&self, _alias: &(String, String)) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn default_methods_report_not_implemented() {
        let stub = Stub;
        let set = AliasSet::new();
        assert_eq!(stub.aliases(&set).await.unwrap_err(), ProviderError::NotImplemented);
        assert!(!stub.provides_metrics());
    }

    #[test]
    fn sleep_time_grows_and_caps() {
        let stub = Stub;
        assert!(stub.sleep_time(0) < stub.sleep_time(3));
        assert_eq!(stub.sleep_time(6), stub.sleep_time(10));
    }
}
