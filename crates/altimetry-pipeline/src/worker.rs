//! The Worker (spec §4.9): bound to one `(provider, phase)` pair, it
//! consumes that pair's queue, invokes the provider through the
//! [`altimetry_retry::RetryEnvelope`], merges the result, and re-enters the
//! pipeline via the [`Orchestrator`].
//!
//! Workers are stateless between iterations: every loop body re-reads the
//! item from the Item Store immediately before merging and writes it back
//! immediately after (§5, Read-modify-write discipline).

use std::sync::Arc;
use std::time::Duration;

use altimetry_core::item::Item;
use altimetry_core::provider::{Phase, ProviderAdapter};
use altimetry_core::queue::WorkQueue;
use altimetry_core::store::ItemStore;
use altimetry_retry::{Outcome, RetryEnvelope};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::orchestrator::Orchestrator;
use crate::queue_name::provider_phase_queue;

/// Bound to one `(provider, phase)` pair. Multiple `Worker`s for the same
/// pair form that provider's worker pool for that phase (§5, Scheduling
/// model).
pub struct Worker {
    provider: Arc<dyn ProviderAdapter>,
    phase: Phase,
    queue: Arc<dyn WorkQueue>,
    store: Arc<dyn ItemStore>,
    orchestrator: Arc<Orchestrator>,
    envelope: RetryEnvelope,
    dequeue_timeout: Duration,
}

impl Worker {
    pub fn new(
        provider: Arc<dyn ProviderAdapter>,
        phase: Phase,
        queue: Arc<dyn WorkQueue>,
        store: Arc<dyn ItemStore>,
        orchestrator: Arc<Orchestrator>,
    ) -> Self {
        Self {
            provider,
            phase,
            queue,
            store,
            orchestrator,
            envelope: RetryEnvelope::new(),
            dequeue_timeout: Duration::from_secs(5),
        }
    }

    fn queue_name(&self) -> String {
        provider_phase_queue(self.provider.name(), self.phase)
    }

    /// Runs until `cancel` fires, processing one tiid at a time.
    pub async fn run(&self, cancel: CancellationToken) {
        let queue_name = self.queue_name();
        loop {
            if cancel.is_cancelled() {
                return;
            }
            match self.queue.dequeue(&queue_name, self.dequeue_timeout).await {
                Ok(Some(tiid)) => self.process(&tiid).await,
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        provider = self.provider.name(),
                        phase = self.phase.as_str(),
                        error = %err,
                        "queue dequeue failed, backing off"
                    );
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    #[instrument(skip(self), fields(provider = self.provider.name(), phase = self.phase.as_str(), tiid = %tiid))]
    async fn process(&self, tiid: &str) {
        let item = match self.store.get(tiid).await {
            Ok(item) => item,
            Err(err) => {
                error!(error = %err, "failed to load item for processing");
                return;
            }
        };

        let relevant = item
            .aliases
            .tuples()
            .iter()
            .any(|alias| self.provider.is_relevant_alias(alias));

        match self.phase {
            Phase::Aliases => self.process_aliases(tiid, item, relevant).await,
            Phase::Biblio => self.process_biblio(tiid, item, relevant).await,
            Phase::Metrics => self.process_metrics(tiid, item, relevant).await,
        }
    }

    async fn process_aliases(&self, tiid: &str, item: Item, relevant: bool) {
        let provider = self.provider.clone();
        let current = item.aliases.clone();
        let outcome = self
            .envelope
            .call(
                relevant,
                provider.max_retries(),
                |count| provider.sleep_time(count),
                move |_use_cache| {
                    let provider = provider.clone();
                    let current = current.clone();
                    async move { provider.aliases(&current).await }
                },
            )
            .await;

        if let Outcome::Success(new_aliases) = &outcome {
            self.merge_and_save(tiid, |item| item.merge_aliases(new_aliases, Utc::now()))
                .await;
        }
        self.log_outcome(&outcome);
        self.reenter(tiid).await;
    }

    async fn process_biblio(&self, tiid: &str, item: Item, relevant: bool) {
        let provider = self.provider.clone();
        let current = item.aliases.clone();
        let outcome = self
            .envelope
            .call(
                relevant,
                provider.max_retries(),
                |count| provider.sleep_time(count),
                move |_use_cache| {
                    let provider = provider.clone();
                    let current = current.clone();
                    async move { provider.biblio(&current).await }
                },
            )
            .await;

        if let Outcome::Success(new_biblio) = &outcome {
            let new_biblio = new_biblio.clone();
            self.merge_and_save(tiid, |item| item.merge_biblio(new_biblio, Utc::now()))
                .await;
        }
        self.log_outcome(&outcome);
        self.reenter(tiid).await;
    }

    async fn process_metrics(&self, tiid: &str, item: Item, relevant: bool) {
        let provider = self.provider.clone();
        let current = item.aliases.clone();
        let provider_name = self.provider.name().to_string();
        let outcome = self
            .envelope
            .call(
                relevant,
                provider.max_retries(),
                |count| provider.sleep_time(count),
                move |_use_cache| {
                    let provider = provider.clone();
                    let current = current.clone();
                    async move { provider.metrics(&current).await }
                },
            )
            .await;

        if let Outcome::Success(observations) = &outcome {
            if !observations.is_empty() {
                let namespaced: Vec<(String, Option<String>, f64)> = observations
                    .iter()
                    .map(|obs| {
                        (
                            format!("{provider_name}:{}", obs.name),
                            obs.provenance_url.clone(),
                            obs.value,
                        )
                    })
                    .collect();
                self.merge_and_save(tiid, |item| item.merge_metrics(namespaced.clone(), Utc::now()))
                    .await;
            }
        }
        self.log_outcome(&outcome);

        match self.orchestrator.complete_metrics(tiid).await {
            Ok(remaining) => info!(remaining, "metrics provider accounted for"),
            Err(err) => error!(error = %err, "failed to decrement progress registry"),
        }
    }

    async fn merge_and_save(&self, tiid: &str, apply: impl FnOnce(&mut Item)) {
        match self.store.get(tiid).await {
            Ok(mut item) => {
                apply(&mut item);
                if let Err(err) = self.store.save(item).await {
                    error!(error = %err, "failed to persist merged item");
                }
            }
            Err(err) => error!(error = %err, "failed to reload item before merge"),
        }
    }

    async fn reenter(&self, tiid: &str) {
        if let Err(err) = self
            .orchestrator
            .advance(tiid, Some((self.provider.name(), self.phase)))
            .await
        {
            error!(error = %err, "failed to re-enter pipeline after phase completion");
        }
    }

    fn log_outcome<T>(&self, outcome: &Outcome<T>) {
        match outcome {
            Outcome::Success(_) => {}
            Outcome::Skipped => {}
            Outcome::Failure(err) => {
                error!(
                    provider = self.provider.name(),
                    phase = self.phase.as_str(),
                    error = %err,
                    "provider call failed permanently"
                );
            }
        }
    }
}
