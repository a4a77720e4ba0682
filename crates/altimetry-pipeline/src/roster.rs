//! The declarative provider roster (spec §4.1, "Provider roster").
//!
//! Adding a provider to the system is "implement [`ProviderAdapter`], add
//! one roster entry" — no change to [`crate::worker::Worker`],
//! [`crate::orchestrator::Orchestrator`], or the sniffer is ever required.

use std::sync::Arc;

use altimetry_core::provider::ProviderAdapter;

/// Worker pool sizes for one provider, one entry per phase. The spec's
/// default is a single worker per phase; hot metrics providers are scaled
/// up independently (§5, Scheduling model).
#[derive(Debug, Clone, Copy)]
pub struct PhaseWorkerCounts {
    pub aliases: usize,
    pub biblio: usize,
    pub metrics: usize,
}

impl Default for PhaseWorkerCounts {
    fn default() -> Self {
        Self {
            aliases: 1,
            biblio: 1,
            metrics: 1,
        }
    }
}

/// One provider's entry in the roster: the adapter plus its worker pool
/// sizes.
#[derive(Clone)]
pub struct ProviderRosterEntry {
    pub provider: Arc<dyn ProviderAdapter>,
    pub worker_counts: PhaseWorkerCounts,
}

impl ProviderRosterEntry {
    pub fn new(provider: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            provider,
            worker_counts: PhaseWorkerCounts::default(),
        }
    }

    pub fn with_worker_counts(mut self, worker_counts: PhaseWorkerCounts) -> Self {
        self.worker_counts = worker_counts;
        self
    }
}

/// The full set of providers the pipeline knows about, loaded once at
/// startup. `altimetry-server`'s configuration layer builds this from the
/// built-in default roster or an operator-supplied roster file (§6,
/// `PROVIDER_ROSTER_FILE`).
#[derive(Clone, Default)]
pub struct ProviderRoster {
    entries: Vec<ProviderRosterEntry>,
}

impl ProviderRoster {
    pub fn new(entries: Vec<ProviderRosterEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ProviderRosterEntry] {
        &self.entries
    }

    /// The flat provider list the sniffer operates over.
    pub fn providers(&self) -> Vec<Arc<dyn ProviderAdapter>> {
        self.entries.iter().map(|e| e.provider.clone()).collect()
    }

    /// The count a freshly-admitted item's progress counter starts at
    /// (§3, Progress counter; §4.10, Admission).
    pub fn metrics_provider_count(&self) -> i64 {
        self.entries
            .iter()
            .filter(|e| e.provider.provides_metrics())
            .count() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use altimetry_providers::fakes::FakeProvider;

    #[test]
    fn counts_only_metric_providers() {
        let roster = ProviderRoster::new(vec![
            ProviderRosterEntry::new(Arc::new(
                FakeProvider::new("dryad").relevant_to("doi"),
            )),
            ProviderRosterEntry::new(Arc::new(
                FakeProvider::new("wikipedia")
                    .relevant_to("doi")
                    .queue_metrics(Ok(vec![])),
            )),
            ProviderRosterEntry::new(Arc::new(
                FakeProvider::new("mendeley")
                    .relevant_to("doi")
                    .queue_metrics(Ok(vec![])),
            )),
        ]);
        assert_eq!(roster.metrics_provider_count(), 2);
        assert_eq!(roster.providers().len(), 3);
    }
}
