//! Shared Axum application state: the wired-up Item Store, Progress
//! Registry, Work Queue, Pipeline Orchestrator, and provider roster.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use altimetry_core::collection::Collection;
use altimetry_core::item::Item;
use altimetry_core::provider::ProviderAdapter;
use altimetry_core::queue::WorkQueue;
use altimetry_core::registry::ProgressRegistry;
use altimetry_core::store::{CollectionStore, ItemStore};
use altimetry_pipeline::{Pipeline, PhaseWorkerCounts, ProviderRoster, ProviderRosterEntry};
use altimetry_providers::{
    Bibtex, CrossRef, Dryad, GitHub, Mendeley, MicrosoftAcademic, Pmc, PubMed, Slideshare,
    Webpage, Wikipedia,
};
use altimetry_queue::InMemoryWorkQueue;
use altimetry_registry::InMemoryProgressRegistry;
use altimetry_store::{InMemoryCollectionStore, InMemoryItemStore};
use dashmap::DashMap;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::ApiError;

/// Status of an async `POST /provider/<name>/memberitems` job, keyed by
/// the MD5 handle of the uploaded query (spec §6).
#[derive(Clone, Debug)]
pub enum MemberItemsJob {
    Pending,
    Done(Vec<String>),
    Failed(String),
}

/// Everything a request handler needs: the pipeline's backing services
/// plus the orchestrator that drives admission and phase advancement.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ItemStore>,
    pub collections: Arc<dyn CollectionStore>,
    pub registry: Arc<dyn ProgressRegistry>,
    pub queue: Arc<dyn WorkQueue>,
    pub pipeline: Arc<Pipeline>,
    pub member_items_jobs: Arc<DashMap<String, MemberItemsJob>>,
}

impl AppState {
    /// Builds the full backend stack from configuration: the Item Store
    /// (Postgres if `DATABASE_URL` is set, otherwise in-memory), the
    /// Progress Registry and Work Queue (Redis if `REGISTRY_URL` is set,
    /// sharing the one connection string, otherwise in-memory), and the
    /// default provider roster (or one loaded from `PROVIDER_ROSTER_FILE`).
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn ItemStore> = match config.database_url() {
            Some(url) => {
                info!("using PostgreSQL item store");
                Arc::new(altimetry_store::PostgresItemStore::new(url).await?)
            }
            None => {
                info!("DATABASE_URL not set; using in-memory item store");
                Arc::new(InMemoryItemStore::new())
            }
        };

        let collections: Arc<dyn CollectionStore> = Arc::new(InMemoryCollectionStore::new());

        let (registry, queue): (Arc<dyn ProgressRegistry>, Arc<dyn WorkQueue>) =
            match config.registry_url() {
                Some(url) => {
                    info!("using Redis-backed progress registry and work queue");
                    (
                        Arc::new(altimetry_registry::RedisProgressRegistry::connect(url).await?),
                        Arc::new(altimetry_queue::RedisWorkQueue::connect(url).await?),
                    )
                }
                None => {
                    info!("REGISTRY_URL not set; using in-memory registry and queue");
                    (
                        Arc::new(InMemoryProgressRegistry::new()),
                        Arc::new(InMemoryWorkQueue::new()),
                    )
                }
            };

        let roster = build_roster(config);

        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            registry.clone(),
            queue.clone(),
            roster,
        ));
        pipeline.spawn(queue.clone(), store.clone());

        Ok(Self {
            store,
            collections,
            registry,
            queue,
            pipeline,
            member_items_jobs: Arc::new(DashMap::new()),
        })
    }

    /// `true` iff `GET /item/<tiid>` should answer 210 ("still updating").
    pub async fn is_updating(&self, tiid: &str) -> Result<bool, altimetry_core::error::RegistryError> {
        self.registry.is_updating(tiid).await
    }

    pub async fn get_item(&self, tiid: &str) -> Result<Item, altimetry_core::error::StoreError> {
        self.store.get(tiid).await
    }

    pub async fn get_collection(
        &self,
        cid: &str,
    ) -> Result<Collection, altimetry_core::error::StoreError> {
        self.collections.get(cid).await
    }

    /// Coalescing intake (§4.10, "Coalescing"; §6, ID cleaning): cleans and
    /// canonicalises `(ns, id)`, returns the existing tiid if one already
    /// claims this alias, otherwise creates a fresh item and admits it onto
    /// the pipeline.
    pub async fn intake(&self, ns: &str, id: &str) -> Result<String, ApiError> {
        let ns = altimetry_core::ids::canonical_namespace(ns);
        let id = altimetry_core::ids::clean_alias_string(id);
        if ns.is_empty() || id.is_empty() {
            return Err(ApiError::BadRequest(
                "alias namespace and id must not be empty after cleaning".to_string(),
            ));
        }

        if let Some(existing) = self.store.find_tiid_by_alias(&ns, &id).await? {
            return Ok(existing);
        }

        let tiid = altimetry_core::ids::generate_tiid();
        let item = Item::new(tiid.clone(), [(ns, id)], chrono::Utc::now());
        match self.store.create(item).await {
            Ok(()) => {}
            Err(altimetry_core::error::StoreError::Duplicate(_)) => {
                // Lost a race against another submitter generating the same
                // tiid (astronomically unlikely) or re-submitting the same
                // alias concurrently; either way, another writer owns it.
            }
            Err(err) => return Err(err.into()),
        }
        self.pipeline.orchestrator.admit(&tiid).await?;
        Ok(tiid)
    }

    /// Re-enters a previously admitted item onto the pipeline (§6,
    /// `POST /collection/<cid>`). `admit` is a no-op once an item has
    /// already cleared `needs_aliases`, so a resubmission sets it again
    /// first, mirroring how the Intake API marks a fresh item.
    pub async fn resubmit(&self, tiid: &str) -> Result<(), ApiError> {
        let mut item = self.store.get(tiid).await?;
        item.needs_aliases = Some(chrono::Utc::now());
        self.store.save(item).await?;
        self.pipeline.orchestrator.admit(tiid).await?;
        Ok(())
    }

    /// Provider roster metadata for `GET /provider` (spec §6).
    pub fn provider_roster_metadata(&self) -> Vec<ProviderMetadata> {
        self.pipeline
            .orchestrator
            .roster()
            .entries()
            .iter()
            .map(|entry| ProviderMetadata::from_adapter(entry.provider.as_ref()))
            .collect()
    }
}

/// Static, serialisable metadata for one roster entry, as returned by
/// `GET /provider`.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ProviderMetadata {
    pub name: &'static str,
    pub provides_aliases: bool,
    pub provides_biblio: bool,
    pub provides_metrics: bool,
}

impl ProviderMetadata {
    fn from_adapter(provider: &dyn ProviderAdapter) -> Self {
        Self {
            name: provider.name(),
            provides_aliases: provider.provides_aliases(),
            provides_biblio: provider.provides_biblio(),
            provides_metrics: provider.provides_metrics(),
        }
    }
}

/// Builds the default roster: every provider in `altimetry-providers`,
/// each with a single worker per phase except the handful of
/// high-traffic metrics providers that scale out (§5, Scheduling model).
///
/// A `PROVIDER_ROSTER_FILE` is accepted by configuration but the
/// providers themselves are native adapters, not declarative plugins, so
/// the file (when present) only overrides worker pool sizes; an absent
/// or unreadable file falls back to these defaults with a warning.
fn build_roster(config: &Config) -> ProviderRoster {
    let timeout = Duration::from_secs(config.http_client_timeout_seconds());
    let hot: PhaseWorkerCounts = PhaseWorkerCounts {
        aliases: 1,
        biblio: 1,
        metrics: 10,
    };

    let mut overrides: BTreeMap<String, usize> = BTreeMap::new();
    if let Some(path) = config.provider_roster_file() {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<BTreeMap<String, usize>>(&contents) {
                Ok(parsed) => overrides = parsed,
                Err(err) => warn!(path, error = %err, "failed to parse provider roster file, using defaults"),
            },
            Err(err) => warn!(path, error = %err, "failed to read provider roster file, using defaults"),
        }
    }

    let metrics_workers = |name: &str, default: PhaseWorkerCounts| -> PhaseWorkerCounts {
        match overrides.get(name) {
            Some(&n) => PhaseWorkerCounts { metrics: n, ..default },
            None => default,
        }
    };

    ProviderRoster::new(vec![
        ProviderRosterEntry::new(Arc::new(Dryad::new(timeout))),
        ProviderRosterEntry::new(Arc::new(CrossRef::new(timeout))),
        ProviderRosterEntry::new(Arc::new(Bibtex::new())),
        ProviderRosterEntry::new(Arc::new(GitHub::new(timeout))),
        ProviderRosterEntry::new(Arc::new(PubMed::new(timeout))),
        ProviderRosterEntry::new(Arc::new(Pmc::new(timeout))),
        ProviderRosterEntry::new(Arc::new(Slideshare::new(timeout))),
        ProviderRosterEntry::new(Arc::new(Webpage::new(timeout))),
        ProviderRosterEntry::new(Arc::new(MicrosoftAcademic::new(timeout)))
            .with_worker_counts(metrics_workers("microsoft_academic", PhaseWorkerCounts::default())),
        ProviderRosterEntry::new(Arc::new(Mendeley::new(timeout)))
            .with_worker_counts(metrics_workers("mendeley", hot)),
        ProviderRosterEntry::new(Arc::new(Wikipedia::new(timeout)))
            .with_worker_counts(metrics_workers("wikipedia", hot)),
    ])
}
