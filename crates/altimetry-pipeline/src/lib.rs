//! Worker pool and Pipeline Orchestrator (spec §4.9, §4.10): the engine
//! that drives an item through alias → biblio → metrics, dispatches work
//! to per-provider workers, and tracks completion via the Progress
//! Registry.
//!
//! This crate owns no I/O backend of its own — it is generic over the
//! [`altimetry_core::store::ItemStore`], [`altimetry_core::registry::ProgressRegistry`],
//! and [`altimetry_core::queue::WorkQueue`] trait objects supplied by its
//! caller, so the same orchestration logic runs against in-memory test
//! doubles or production Redis/Postgres backends unchanged.

mod orchestrator;
mod queue_name;
mod roster;
mod worker;

pub use orchestrator::{Orchestrator, OrchestratorError};
pub use queue_name::{provider_phase_queue, ALIASES_QUEUE};
pub use roster::{PhaseWorkerCounts, ProviderRoster, ProviderRosterEntry};
pub use worker::Worker;

use std::sync::Arc;
use std::time::Duration;

use altimetry_core::provider::Phase;
use altimetry_core::queue::WorkQueue;
use altimetry_core::registry::ProgressRegistry;
use altimetry_core::store::ItemStore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// A fully wired pipeline: the shared [`Orchestrator`] plus every worker
/// its roster calls for. Construct one per process and call [`Pipeline::spawn`]
/// once the HTTP façade (or any other intake collaborator) is ready to
/// start admitting items.
pub struct Pipeline {
    pub orchestrator: Arc<Orchestrator>,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn ItemStore>,
        registry: Arc<dyn ProgressRegistry>,
        queue: Arc<dyn WorkQueue>,
        roster: ProviderRoster,
    ) -> Self {
        Self {
            orchestrator: Arc::new(Orchestrator::new(store, registry, queue, roster)),
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Spawns the admission consumer, the reconciliation sweep, and every
    /// `(provider, phase)` worker pool named by the roster's worker
    /// counts. Returns the join handles so the caller can await a clean
    /// shutdown once `cancellation_token()` is triggered.
    pub fn spawn(&self, queue: Arc<dyn WorkQueue>, store: Arc<dyn ItemStore>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        {
            let orchestrator = self.orchestrator.clone();
            let cancel = self.cancel.clone();
            handles.push(tokio::spawn(async move {
                orchestrator.run_admission_consumer(cancel).await;
            }));
        }

        {
            let orchestrator = self.orchestrator.clone();
            let cancel = self.cancel.clone();
            handles.push(tokio::spawn(async move {
                orchestrator.run_reconciliation_loop(Duration::from_secs(30), cancel).await;
            }));
        }

        for entry in self.orchestrator.roster().entries() {
            let phases = [
                (Phase::Aliases, entry.provider.provides_aliases(), entry.worker_counts.aliases),
                (Phase::Biblio, entry.provider.provides_biblio(), entry.worker_counts.biblio),
                (Phase::Metrics, entry.provider.provides_metrics(), entry.worker_counts.metrics),
            ];
            for (phase, enabled, count) in phases {
                if !enabled {
                    continue;
                }
                for _ in 0..count.max(1) {
                    let worker = Worker::new(
                        entry.provider.clone(),
                        phase,
                        queue.clone(),
                        store.clone(),
                        self.orchestrator.clone(),
                    );
                    let cancel = self.cancel.clone();
                    let provider_name = entry.provider.name();
                    handles.push(tokio::spawn(async move {
                        info!(provider = provider_name, phase = phase.as_str(), "worker started");
                        worker.run(cancel).await;
                    }));
                }
            }
        }

        handles
    }

    /// Signals every spawned task to stop after its current item completes
    /// (§5, Cancellation/timeouts).
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod end_to_end_tests {
    use super::*;
    use altimetry_core::alias::AliasSet;
    use altimetry_core::item::Item;
    use altimetry_core::provider::MetricObservation;
    use altimetry_core::store::ItemStore as _;
    use altimetry_providers::fakes::FakeProvider;
    use altimetry_queue::InMemoryWorkQueue;
    use altimetry_registry::InMemoryProgressRegistry;
    use altimetry_store::InMemoryItemStore;
    use chrono::Utc;
    use std::time::Duration as StdDuration;

    async fn wait_until_complete(
        store: &InMemoryItemStore,
        registry: &InMemoryProgressRegistry,
        tiid: &str,
    ) {
        for _ in 0..200 {
            let item = store.get(tiid).await.unwrap();
            let updating = registry.is_updating(tiid).await.unwrap();
            if !updating && item.needs_aliases.is_none() {
                return;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
        panic!("pipeline did not converge for {tiid}");
    }

    /// Spec §8 scenario S1, adapted to a fake in place of the real Dryad
    /// HTTP client: submit a Dryad DOI, watch it flow through aliases,
    /// biblio, then metrics, with no real network I/O.
    #[tokio::test]
    async fn dryad_doi_end_to_end() {
        let store = Arc::new(InMemoryItemStore::new());
        let registry = Arc::new(InMemoryProgressRegistry::new());
        let queue: Arc<InMemoryWorkQueue> = Arc::new(InMemoryWorkQueue::new());

        let mut dryad_aliases = AliasSet::new();
        dryad_aliases.add("title", "Data from: Can clone size serve as a proxy?");
        let mut dryad_biblio = std::collections::BTreeMap::new();
        dryad_biblio.insert("year".to_string(), serde_json::json!("2010"));

        let dryad = FakeProvider::new("dryad")
            .relevant_to("doi")
            .queue_aliases(Ok(dryad_aliases))
            .queue_biblio(Ok(dryad_biblio));
        let wikipedia = FakeProvider::new("wikipedia")
            .relevant_to("doi")
            .queue_metrics(Ok(vec![MetricObservation {
                name: "mentions".to_string(),
                provenance_url: Some("https://en.wikipedia.org/wiki/Special:Cite".to_string()),
                value: 2.0,
            }]));

        let roster = ProviderRoster::new(vec![
            ProviderRosterEntry::new(Arc::new(dryad)),
            ProviderRosterEntry::new(Arc::new(wikipedia)),
        ]);

        let pipeline = Pipeline::new(
            store.clone() as Arc<dyn ItemStore>,
            registry.clone() as Arc<dyn ProgressRegistry>,
            queue.clone() as Arc<dyn WorkQueue>,
            roster,
        );
        let handles = pipeline.spawn(
            queue.clone() as Arc<dyn WorkQueue>,
            store.clone() as Arc<dyn ItemStore>,
        );

        let tiid = "0123456789abcdef01234567";
        let item = Item::new(
            tiid,
            [("doi".to_string(), "10.5061/dryad.7898".to_string())],
            Utc::now(),
        );
        store.create(item).await.unwrap();
        pipeline.orchestrator.admit(tiid).await.unwrap();

        wait_until_complete(&store, &registry, tiid).await;

        let finished = store.get(tiid).await.unwrap();
        assert_eq!(finished.aliases.ids_for("doi"), &["10.5061/dryad.7898".to_string()]);
        assert_eq!(
            finished.biblio.get("year"),
            Some(&serde_json::json!("2010"))
        );
        assert!(finished.metrics.contains_key("wikipedia:mentions"));
        assert_eq!(registry.get(tiid).await.unwrap(), Some(0));

        pipeline.shutdown();
        for handle in handles {
            let _ = tokio::time::timeout(StdDuration::from_secs(1), handle).await;
        }
    }

    /// Spec §8 scenario S2: an item with an alias no provider recognises
    /// falls through to the `webpage` fallback, which fails permanently,
    /// but the item still reaches a completed state with its original
    /// alias intact.
    #[tokio::test]
    async fn unknown_namespace_still_completes() {
        let store = Arc::new(InMemoryItemStore::new());
        let registry = Arc::new(InMemoryProgressRegistry::new());
        let queue: Arc<InMemoryWorkQueue> = Arc::new(InMemoryWorkQueue::new());

        let webpage = FakeProvider::new("webpage")
            .relevant_to("foo")
            .with_max_retries(0)
            .queue_aliases(Err(altimetry_core::error::ProviderError::ClientError(
                "404".into(),
            )));
        let mendeley = FakeProvider::new("mendeley")
            .relevant_to("doi")
            .queue_metrics(Ok(vec![]));

        let roster = ProviderRoster::new(vec![
            ProviderRosterEntry::new(Arc::new(webpage)),
            ProviderRosterEntry::new(Arc::new(mendeley)),
        ]);

        let pipeline = Pipeline::new(
            store.clone() as Arc<dyn ItemStore>,
            registry.clone() as Arc<dyn ProgressRegistry>,
            queue.clone() as Arc<dyn WorkQueue>,
            roster,
        );
        let handles = pipeline.spawn(
            queue.clone() as Arc<dyn WorkQueue>,
            store.clone() as Arc<dyn ItemStore>,
        );

        let tiid = "abcdefabcdefabcdefabcdef";
        let item = Item::new(tiid, [("foo".to_string(), "bar".to_string())], Utc::now());
        store.create(item).await.unwrap();
        pipeline.orchestrator.admit(tiid).await.unwrap();

        wait_until_complete(&store, &registry, tiid).await;

        let finished = store.get(tiid).await.unwrap();
        assert_eq!(finished.aliases.ids_for("foo"), &["bar".to_string()]);
        assert_eq!(registry.get(tiid).await.unwrap(), Some(0));

        pipeline.shutdown();
        for handle in handles {
            let _ = tokio::time::timeout(StdDuration::from_secs(1), handle).await;
        }
    }
}
