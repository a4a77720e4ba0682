//! In-process fakes for [`ProviderAdapter`], used by unit tests in this
//! crate and by `altimetry-pipeline`'s end-to-end tests to drive the whole
//! admission → worker → completion cycle without real network I/O.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use altimetry_core::alias::AliasSet;
use altimetry_core::error::ProviderError;
use altimetry_core::provider::{MetricObservation, ProviderAdapter};
use async_trait::async_trait;
use serde_json::Value;

type AliasScript = Mutex<VecDeque<Result<AliasSet, ProviderError>>>;
type BiblioScript = Mutex<VecDeque<Result<BTreeMap<String, Value>, ProviderError>>>;
type MetricsScript = Mutex<VecDeque<Result<Vec<MetricObservation>, ProviderError>>>;

/// A scriptable provider: each call to `aliases`/`biblio`/`metrics` pops
/// the next queued result, so tests can exercise "fails twice then
/// succeeds" retry scenarios (spec §8, S5) as well as straightforward
/// happy-path fans.
pub struct FakeProvider {
    name: &'static str,
    provides_aliases: bool,
    provides_biblio: bool,
    provides_metrics: bool,
    relevant_namespaces: Vec<String>,
    max_retries: i64,
    alias_script: AliasScript,
    biblio_script: BiblioScript,
    metrics_script: MetricsScript,
}

impl FakeProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            provides_aliases: false,
            provides_biblio: false,
            provides_metrics: false,
            relevant_namespaces: Vec::new(),
            max_retries: 5,
            alias_script: Mutex::new(VecDeque::new()),
            biblio_script: Mutex::new(VecDeque::new()),
            metrics_script: Mutex::new(VecDeque::new()),
        }
    }

    pub fn relevant_to(mut self, namespace: impl Into<String>) -> Self {
        self.relevant_namespaces.push(namespace.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: i64) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn queue_aliases(self, result: Result<AliasSet, ProviderError>) -> Self {
        self.alias_script.lock().unwrap().push_back(result);
        Self {
            provides_aliases: true,
            ..self
        }
    }

    pub fn queue_biblio(self, result: Result<BTreeMap<String, Value>, ProviderError>) -> Self {
        self.biblio_script.lock().unwrap().push_back(result);
        Self {
            provides_biblio: true,
            ..self
        }
    }

    pub fn queue_metrics(self, result: Result<Vec<MetricObservation>, ProviderError>) -> Self {
        self.metrics_script.lock().unwrap().push_back(result);
        Self {
            provides_metrics: true,
            ..self
        }
    }
}

#[async_trait]
impl ProviderAdapter for FakeProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn provides_aliases(&self) -> bool {
        self.provides_aliases
    }

    fn provides_biblio(&self) -> bool {
        self.provides_biblio
    }

    fn provides_metrics(&self) -> bool {
        self.provides_metrics
    }

    fn is_relevant_alias(&self, alias: &(String, String)) -> bool {
        self.relevant_namespaces.iter().any(|ns| ns == &alias.0)
    }

    fn max_retries(&self) -> i64 {
        self.max_retries
    }

    fn sleep_time(&self, _error_count: u32) -> Duration {
        Duration::from_millis(1)
    }

    async fn aliases(&self, _current: &AliasSet) -> Result<AliasSet, ProviderError> {
        self.alias_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ProviderError::NotImplemented))
    }

    async fn biblio(&self, _current: &AliasSet) -> Result<BTreeMap<String, Value>, ProviderError> {
        self.biblio_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ProviderError::NotImplemented))
    }

    async fn metrics(&self, _current: &AliasSet) -> Result<Vec<MetricObservation>, ProviderError> {
        self.metrics_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ProviderError::NotImplemented))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_queued_results_in_order() {
        let provider = FakeProvider::new("fake")
            .relevant_to("doi")
            .queue_aliases(Err(ProviderError::ServerError("500".into())))
            .queue_aliases(Ok(AliasSet::new()));

        let empty = AliasSet::new();
        let first = provider.aliases(&empty).await;
        assert_eq!(first, Err(ProviderError::ServerError("500".into())));
        let second = provider.aliases(&empty).await;
        assert_eq!(second, Ok(AliasSet::new()));
    }

    #[tokio::test]
    async fn unscripted_call_reports_not_implemented() {
        let provider = FakeProvider::new("fake");
        let empty = AliasSet::new();
        assert_eq!(
            provider.aliases(&empty).await,
            Err(ProviderError::NotImplemented)
        );
    }
}
