//! Work Queue naming convention.
//!
//! The spec describes "one logical queue per provider name" (§4.5), but a
//! Worker is bound to a `(provider, phase)` pair (§4.9) and a provider may
//! have outstanding work in more than one phase's queue at once (e.g. its
//! aliases-phase worker idle while its biblio-phase worker drains a
//! backlog). We scope each provider's queue by phase so dequeuing is
//! unambiguous; the distinguished `"aliases"` pre-queue (admission only,
//! §4.5) keeps its bare name since it has no phase of its own.

use altimetry_core::provider::Phase;

/// Name of the pre-alias queue every freshly-admitted item is enqueued
/// onto, awaiting the orchestrator's first routing pass.
pub const ALIASES_QUEUE: &str = "aliases";

/// The queue name a `(provider, phase)` worker pair consumes.
pub fn provider_phase_queue(provider_name: &str, phase: Phase) -> String {
    format!("{provider_name}:{}", phase.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_provider_and_phase() {
        assert_eq!(provider_phase_queue("dryad", Phase::Aliases), "dryad:aliases");
        assert_eq!(provider_phase_queue("wikipedia", Phase::Metrics), "wikipedia:metrics");
    }
}
