//! The Pipeline Orchestrator (spec §4.10): admission, phase advancement,
//! and coalescing. Holds no item data of its own beyond the per-tiid
//! bookkeeping needed to run the pure [`altimetry_sniffer::sniff`]
//! function — the Item Store remains the system of record.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use altimetry_core::error::{QueueError, RegistryError, StoreError};
use altimetry_core::item::Item;
use altimetry_core::provider::Phase;
use altimetry_core::queue::WorkQueue;
use altimetry_core::registry::ProgressRegistry;
use altimetry_core::store::ItemStore;
use altimetry_sniffer::{sniff, AlreadyRun};
use chrono::Utc;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::queue_name::{provider_phase_queue, ALIASES_QUEUE};
use crate::roster::ProviderRoster;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Drives every item through the alias → biblio → metrics phase sequence.
///
/// One `Orchestrator` is shared (via `Arc`) between the HTTP intake layer,
/// the admission reconciliation loop, and every [`crate::worker::Worker`]
/// in the process, since phase advancement must be consistent no matter
/// who triggers it.
pub struct Orchestrator {
    store: Arc<dyn ItemStore>,
    registry: Arc<dyn ProgressRegistry>,
    queue: Arc<dyn WorkQueue>,
    roster: ProviderRoster,
    /// `(provider, phase)` pairs already executed this update, per tiid.
    /// Cleared once the item's progress counter reaches zero.
    already_run: DashMap<String, AlreadyRun>,
    /// Serializes phase-advancement for a single tiid so concurrent
    /// alias/biblio completions can't race each other into double-enqueuing
    /// or double-fanning-out metrics (§5, Read-modify-write discipline).
    item_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ItemStore>,
        registry: Arc<dyn ProgressRegistry>,
        queue: Arc<dyn WorkQueue>,
        roster: ProviderRoster,
    ) -> Self {
        Self {
            store,
            registry,
            queue,
            roster,
            already_run: DashMap::new(),
            item_locks: DashMap::new(),
        }
    }

    pub fn roster(&self) -> &ProviderRoster {
        &self.roster
    }

    fn lock_for(&self, tiid: &str) -> Arc<Mutex<()>> {
        self.item_locks
            .entry(tiid.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Admits a single item: sets the progress counter to the total number
    /// of metric-providing providers, clears `needs_aliases`, and enqueues
    /// the item onto the aliases pre-queue (§4.10, Admission). A no-op if
    /// the item is not currently marked as needing aliases.
    #[instrument(skip(self), fields(tiid = %tiid))]
    pub async fn admit(&self, tiid: &str) -> Result<(), OrchestratorError> {
        let lock = self.lock_for(tiid);
        let _guard = lock.lock().await;

        let mut item = self.store.get(tiid).await?;
        if item.needs_aliases.is_none() {
            debug!("item already admitted, skipping");
            return Ok(());
        }

        self.registry.set(tiid, self.roster.metrics_provider_count()).await?;
        item.needs_aliases = None;
        item.last_modified = Utc::now();
        self.store.save(item).await?;
        self.already_run.insert(tiid.to_string(), AlreadyRun::new());
        self.queue.enqueue(ALIASES_QUEUE, tiid).await?;
        info!("admitted item onto the pipeline");
        Ok(())
    }

    /// Reconciliation sweep: admits every item the Item Store reports as
    /// still needing aliases. Safe to call repeatedly; `admit` is
    /// idempotent. Exists for crash recovery (§5, Cancellation/timeouts) —
    /// the HTTP intake layer admits synchronously on creation, so under
    /// normal operation this sweep finds nothing to do.
    pub async fn reconcile(&self) -> Result<usize, OrchestratorError> {
        let pending = self.store.items_needing_aliases().await?;
        let mut admitted = 0;
        for tiid in pending {
            self.admit(&tiid).await?;
            admitted += 1;
        }
        Ok(admitted)
    }

    /// Runs the reconciliation sweep on a fixed interval until `cancel` is
    /// triggered.
    pub async fn run_reconciliation_loop(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {
                    match self.reconcile().await {
                        Ok(0) => {}
                        Ok(n) => info!(admitted = n, "reconciliation admitted stragglers"),
                        Err(err) => warn!(error = %err, "reconciliation sweep failed"),
                    }
                }
            }
        }
    }

    /// Consumes the aliases pre-queue: the first routing pass for a
    /// newly-admitted item, always with an empty `already_run` set.
    pub async fn run_admission_consumer(&self, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                return;
            }
            match self.queue.dequeue(ALIASES_QUEUE, Duration::from_secs(5)).await {
                Ok(Some(tiid)) => {
                    if let Err(err) = self.advance(&tiid, None).await {
                        warn!(tiid = %tiid, error = %err, "initial routing failed");
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(error = %err, "aliases pre-queue dequeue failed");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Phase advancement (§4.10): called by a Worker once it has merged an
    /// alias- or biblio-phase result (`completed = Some((provider, phase))`)
    /// or by the admission consumer for the very first routing pass
    /// (`completed = None`). Re-runs the Sniffer and either enqueues the
    /// next provider(s) or, once both aliases and biblio have reached a
    /// fixed point, fans out the metrics phase.
    #[instrument(skip(self), fields(tiid = %tiid))]
    pub async fn advance(
        &self,
        tiid: &str,
        completed: Option<(&str, Phase)>,
    ) -> Result<(), OrchestratorError> {
        let lock = self.lock_for(tiid);
        let _guard = lock.lock().await;

        let item = self.store.get(tiid).await?;

        {
            let mut entry = self.already_run.entry(tiid.to_string()).or_default();
            if let Some((provider, phase)) = completed {
                entry.insert((provider.to_string(), phase));
            }
        }
        let already_run = self
            .already_run
            .get(tiid)
            .map(|e| e.value().clone())
            .unwrap_or_default();

        let output = sniff(&self.roster.providers(), &item.aliases, &already_run);

        if !output.aliases_phase.is_empty() {
            for provider in &output.aliases_phase {
                self.queue
                    .enqueue(&provider_phase_queue(provider, Phase::Aliases), tiid)
                    .await?;
            }
            return Ok(());
        }

        if !output.biblio_phase.is_empty() {
            for provider in &output.biblio_phase {
                self.queue
                    .enqueue(&provider_phase_queue(provider, Phase::Biblio), tiid)
                    .await?;
            }
            return Ok(());
        }

        self.fan_out_metrics(tiid, &item, already_run).await
    }

    /// Rule 4: aliases and biblio have both reached a fixed point. Every
    /// metric-providing provider either gets enqueued (if relevant to a
    /// current alias) or is immediately counted as done with a Registry
    /// decrement (§4.10, "Providers for which no alias is relevant count
    /// as done immediately").
    async fn fan_out_metrics(
        &self,
        tiid: &str,
        item: &Item,
        mut already_run: AlreadyRun,
    ) -> Result<(), OrchestratorError> {
        let mut dispatched = false;
        for entry in self.roster.entries() {
            if !entry.provider.provides_metrics() {
                continue;
            }
            if already_run.contains(&(entry.provider.name().to_string(), Phase::Metrics)) {
                continue;
            }
            let relevant = item
                .aliases
                .tuples()
                .iter()
                .any(|alias| entry.provider.is_relevant_alias(alias));

            already_run.insert((entry.provider.name().to_string(), Phase::Metrics));
            if relevant {
                self.queue
                    .enqueue(
                        &provider_phase_queue(entry.provider.name(), Phase::Metrics),
                        tiid,
                    )
                    .await?;
                dispatched = true;
            } else {
                self.decrement_and_maybe_clear(tiid).await?;
            }
        }
        self.already_run.insert(tiid.to_string(), already_run);
        if !dispatched {
            debug!("no metrics provider was relevant; update may already be complete");
        }
        Ok(())
    }

    /// Called by a metrics-phase Worker once its provider call is fully
    /// resolved (success, failure, or skip — §4.9 steps 4-6 all decrement).
    pub async fn complete_metrics(&self, tiid: &str) -> Result<i64, OrchestratorError> {
        self.decrement_and_maybe_clear(tiid).await
    }

    async fn decrement_and_maybe_clear(&self, tiid: &str) -> Result<i64, OrchestratorError> {
        let remaining = self.registry.decr(tiid).await?;
        if remaining <= 0 {
            self.already_run.remove(tiid);
            self.item_locks.remove(tiid);
        }
        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use altimetry_core::alias::AliasSet;
    use altimetry_providers::fakes::FakeProvider;
    use altimetry_queue::InMemoryWorkQueue;
    use altimetry_registry::InMemoryProgressRegistry;
    use altimetry_store::InMemoryItemStore;
    use crate::roster::ProviderRosterEntry;

    fn item_with(ns: &str, id: &str) -> Item {
        let mut aliases = AliasSet::new();
        aliases.add(ns, id);
        Item {
            tiid: "tiid1".to_string(),
            created: Utc::now(),
            last_modified: Utc::now(),
            aliases,
            biblio: Default::default(),
            metrics: Default::default(),
            needs_aliases: Some(Utc::now()),
        }
    }

    fn harness() -> (
        Arc<InMemoryItemStore>,
        Arc<InMemoryProgressRegistry>,
        Arc<InMemoryWorkQueue>,
    ) {
        (
            Arc::new(InMemoryItemStore::new()),
            Arc::new(InMemoryProgressRegistry::new()),
            Arc::new(InMemoryWorkQueue::new()),
        )
    }

    #[tokio::test]
    async fn admit_sets_progress_and_enqueues_pre_queue() {
        let (store, registry, queue) = harness();
        store.create(item_with("doi", "10.1/a")).await.unwrap();

        let roster = ProviderRoster::new(vec![ProviderRosterEntry::new(Arc::new(
            FakeProvider::new("wikipedia")
                .relevant_to("doi")
                .queue_metrics(Ok(vec![])),
        ))]);
        let orchestrator = Orchestrator::new(store.clone(), registry.clone(), queue.clone(), roster);

        orchestrator.admit("tiid1").await.unwrap();

        assert_eq!(registry.get("tiid1").await.unwrap(), Some(1));
        let item = store.get("tiid1").await.unwrap();
        assert!(item.needs_aliases.is_none());
        assert_eq!(queue.size(ALIASES_QUEUE).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn admit_is_idempotent() {
        let (store, registry, queue) = harness();
        store.create(item_with("doi", "10.1/a")).await.unwrap();
        let roster = ProviderRoster::new(vec![]);
        let orchestrator = Orchestrator::new(store.clone(), registry.clone(), queue.clone(), roster);

        orchestrator.admit("tiid1").await.unwrap();
        orchestrator.admit("tiid1").await.unwrap();

        assert_eq!(queue.size(ALIASES_QUEUE).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn advance_with_no_aliases_or_biblio_fans_out_metrics() {
        let (store, registry, queue) = harness();
        let mut item = item_with("doi", "10.1/a");
        item.needs_aliases = None;
        store.create(item).await.unwrap();
        registry.set("tiid1", 2).await.unwrap();

        let roster = ProviderRoster::new(vec![
            ProviderRosterEntry::new(Arc::new(
                FakeProvider::new("wikipedia")
                    .relevant_to("doi")
                    .queue_metrics(Ok(vec![])),
            )),
            ProviderRosterEntry::new(Arc::new(
                FakeProvider::new("slideshare")
                    .relevant_to("url")
                    .queue_metrics(Ok(vec![])),
            )),
        ]);
        let orchestrator = Orchestrator::new(store.clone(), registry.clone(), queue.clone(), roster);

        orchestrator.advance("tiid1", None).await.unwrap();

        assert_eq!(
            queue
                .size(&provider_phase_queue("wikipedia", Phase::Metrics))
                .await
                .unwrap(),
            1
        );
        // slideshare isn't relevant to any alias on the item: counted as
        // done immediately via a registry decrement, never enqueued.
        assert_eq!(
            queue
                .size(&provider_phase_queue("slideshare", Phase::Metrics))
                .await
                .unwrap(),
            0
        );
        assert_eq!(registry.get("tiid1").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn complete_metrics_clears_bookkeeping_once_done() {
        let (store, registry, queue) = harness();
        let mut item = item_with("doi", "10.1/a");
        item.needs_aliases = None;
        store.create(item).await.unwrap();
        registry.set("tiid1", 1).await.unwrap();

        let roster = ProviderRoster::new(vec![]);
        let orchestrator = Orchestrator::new(store, registry.clone(), queue, roster);
        orchestrator.already_run.insert("tiid1".to_string(), AlreadyRun::new());

        let remaining = orchestrator.complete_metrics("tiid1").await.unwrap();
        assert_eq!(remaining, 0);
        assert!(orchestrator.already_run.get("tiid1").is_none());
    }
}
