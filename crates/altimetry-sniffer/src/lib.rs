//! The Sniffer / Router (spec §4.8): a pure, deterministic function that
//! decides which providers to run next, in which phase, given an item's
//! current aliases and which providers have already run this update.
//!
//! The sniffer performs no I/O. It is the single source of truth for
//! per-item ordering: aliases strictly precede biblio, which strictly
//! precedes the metrics fan-out (§5, Ordering guarantees).

use std::collections::HashSet;
use std::sync::Arc;

use altimetry_core::alias::AliasSet;
use altimetry_core::provider::{Phase, ProviderAdapter};

/// Identifies one `(provider name, phase)` pair that has already executed
/// during the current update, so the sniffer never re-schedules it.
pub type AlreadyRun = HashSet<(String, Phase)>;

/// The three disjoint lists of provider names to run next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnifferOutput {
    pub aliases_phase: Vec<String>,
    pub biblio_phase: Vec<String>,
    pub metrics_phase: Vec<String>,
}

impl SnifferOutput {
    pub fn is_empty(&self) -> bool {
        self.aliases_phase.is_empty() && self.biblio_phase.is_empty() && self.metrics_phase.is_empty()
    }
}

fn is_relevant_to_any(provider: &dyn ProviderAdapter, aliases: &AliasSet) -> bool {
    aliases
        .tuples()
        .iter()
        .any(|alias| provider.is_relevant_alias(alias))
}

/// `true` iff some alias on the item carries a namespace that no
/// alias-providing provider in the roster recognises as relevant — the
/// trigger for rule 2's `webpage` fallback.
fn has_unknown_namespace_alias(providers: &[Arc<dyn ProviderAdapter>], aliases: &AliasSet) -> bool {
    aliases.tuples().iter().any(|alias| {
        !providers
            .iter()
            .filter(|p| p.provides_aliases())
            .any(|p| p.is_relevant_alias(alias))
    })
}

/// Runs the sniffer over the current roster and item aliases.
///
/// Alias- and biblio-phase scheduling each only fires once `already_run`
/// records that every prerequisite provider has had its turn; the metrics
/// phase only appears once both upstream phases have reached a fixed point
/// (rule 4).
pub fn sniff(
    providers: &[Arc<dyn ProviderAdapter>],
    aliases: &AliasSet,
    already_run: &AlreadyRun,
) -> SnifferOutput {
    let aliases_phase: Vec<String> = providers
        .iter()
        .filter(|p| p.provides_aliases())
        .filter(|p| !already_run.contains(&(p.name().to_string(), Phase::Aliases)))
        .filter(|p| is_relevant_to_any(p.as_ref(), aliases))
        .map(|p| p.name().to_string())
        .collect();

    let aliases_phase = if aliases_phase.is_empty() {
        // Rule 2: no provider can contribute aliases directly; fall back to
        // resolving a URL via `webpage` if one isn't already known and some
        // alias carries a namespace no provider recognises.
        let webpage_already_ran = already_run.contains(&("webpage".to_string(), Phase::Aliases));
        let webpage_applicable = providers.iter().any(|p| p.name() == "webpage");
        if !webpage_already_ran
            && webpage_applicable
            && !aliases.has_namespace("url")
            && has_unknown_namespace_alias(providers, aliases)
        {
            vec!["webpage".to_string()]
        } else {
            Vec::new()
        }
    } else {
        aliases_phase
    };

    if !aliases_phase.is_empty() {
        return SnifferOutput {
            aliases_phase,
            biblio_phase: Vec::new(),
            metrics_phase: Vec::new(),
        };
    }

    // Rule 3: aliases have reached a fixed point; decide biblio next by the
    // symmetric rule (no "webpage" fallback — biblio has no analogous
    // resolution step).
    let biblio_phase: Vec<String> = providers
        .iter()
        .filter(|p| p.provides_biblio())
        .filter(|p| !already_run.contains(&(p.name().to_string(), Phase::Biblio)))
        .filter(|p| is_relevant_to_any(p.as_ref(), aliases))
        .map(|p| p.name().to_string())
        .collect();

    if !biblio_phase.is_empty() {
        return SnifferOutput {
            aliases_phase: Vec::new(),
            biblio_phase,
            metrics_phase: Vec::new(),
        };
    }

    // Rule 4: both upstream phases are at a fixed point; fan out metrics to
    // every metric-providing provider relevant to at least one current
    // alias.
    let metrics_phase: Vec<String> = providers
        .iter()
        .filter(|p| p.provides_metrics())
        .filter(|p| !already_run.contains(&(p.name().to_string(), Phase::Metrics)))
        .filter(|p| is_relevant_to_any(p.as_ref(), aliases))
        .map(|p| p.name().to_string())
        .collect();

    SnifferOutput {
        aliases_phase: Vec::new(),
        biblio_phase: Vec::new(),
        metrics_phase,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Stub {
        name: &'static str,
        aliases: bool,
        biblio: bool,
        metrics: bool,
        relevant_namespace: &'static str,
    }

    #[async_trait]
    impl ProviderAdapter for Stub {
        fn name(&self) -> &'static str {
            self.name
        }
        fn provides_aliases(&self) -> bool {
            self.aliases
        }
        fn provides_biblio(&self) -> bool {
            self.biblio
        }
        fn provides_metrics(&self) -> bool {
            self.metrics
        }
        fn is_relevant_alias(&self, alias: &(String, String)) -> bool {
            alias.0 == self.relevant_namespace
        }
    }

    fn roster() -> Vec<Arc<dyn ProviderAdapter>> {
        vec![
            Arc::new(Stub {
                name: "dryad",
                aliases: true,
                biblio: true,
                metrics: false,
                relevant_namespace: "doi",
            }),
            Arc::new(Stub {
                name: "wikipedia",
                aliases: false,
                biblio: false,
                metrics: true,
                relevant_namespace: "doi",
            }),
            Arc::new(Stub {
                name: "webpage",
                aliases: true,
                biblio: false,
                metrics: false,
                relevant_namespace: "url",
            }),
        ]
    }

    fn aliases_with(ns: &str, id: &str) -> AliasSet {
        let mut set = AliasSet::new();
        set.add(ns, id);
        set
    }

    #[test]
    fn schedules_aliases_before_biblio_before_metrics() {
        let providers = roster();
        let aliases = aliases_with("doi", "10.5061/dryad.7898");
        let already_run = AlreadyRun::new();

        let step1 = sniff(&providers, &aliases, &already_run);
        assert_eq!(step1.aliases_phase, vec!["dryad".to_string()]);
        assert!(step1.biblio_phase.is_empty() && step1.metrics_phase.is_empty());

        let mut after_aliases = already_run.clone();
        after_aliases.insert(("dryad".to_string(), Phase::Aliases));
        let step2 = sniff(&providers, &aliases, &after_aliases);
        assert_eq!(step2.biblio_phase, vec!["dryad".to_string()]);
        assert!(step2.aliases_phase.is_empty() && step2.metrics_phase.is_empty());

        let mut after_biblio = after_aliases.clone();
        after_biblio.insert(("dryad".to_string(), Phase::Biblio));
        let step3 = sniff(&providers, &aliases, &after_biblio);
        assert_eq!(step3.metrics_phase, vec!["wikipedia".to_string()]);
        assert!(step3.aliases_phase.is_empty() && step3.biblio_phase.is_empty());
    }

    #[test]
    fn unknown_namespace_falls_back_to_webpage() {
        let providers = roster();
        let aliases = aliases_with("foo", "bar");
        let already_run = AlreadyRun::new();
        let output = sniff(&providers, &aliases, &already_run);
        assert_eq!(output.aliases_phase, vec!["webpage".to_string()]);
    }

    #[test]
    fn webpage_fallback_does_not_repeat_once_run() {
        let providers = roster();
        let aliases = aliases_with("foo", "bar");
        let mut already_run = AlreadyRun::new();
        already_run.insert(("webpage".to_string(), Phase::Aliases));
        let output = sniff(&providers, &aliases, &already_run);
        assert!(output.is_empty());
    }

    #[test]
    fn sniffer_is_pure_same_inputs_same_outputs() {
        let providers = roster();
        let aliases = aliases_with("doi", "10.1/a");
        let already_run = AlreadyRun::new();
        let a = sniff(&providers, &aliases, &already_run);
        let b = sniff(&providers, &aliases, &already_run);
        assert_eq!(a, b);
    }
}
