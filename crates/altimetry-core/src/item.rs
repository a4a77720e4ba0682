//! The central `Item` entity and its merge rules.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::alias::AliasSet;
use crate::metric::MetricRecord;

/// Coarse content type, derived lazily from an item's aliases. Never stored
/// directly; recomputed on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    Article,
    Dataset,
    Slides,
    Software,
    Webpage,
    Unknown,
}

impl Genre {
    pub fn from_aliases(aliases: &AliasSet) -> Self {
        let is_dryad_doi = aliases
            .ids_for("doi")
            .iter()
            .any(|id| id.starts_with("10.5061/dryad"));
        let is_github_url = aliases.ids_for("url").iter().any(|u| u.contains("github.com/"));
        let is_slideshare_url = aliases
            .ids_for("url")
            .iter()
            .any(|u| u.contains("slideshare.net/"));

        if is_dryad_doi {
            Genre::Dataset
        } else if aliases.has_namespace("doi") || aliases.has_namespace("pmid") {
            Genre::Article
        } else if is_slideshare_url {
            Genre::Slides
        } else if is_github_url {
            Genre::Software
        } else if aliases.has_namespace("url") {
            Genre::Webpage
        } else {
            Genre::Unknown
        }
    }
}

/// A scholarly item tracked by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub tiid: String,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub aliases: AliasSet,
    pub biblio: BTreeMap<String, Value>,
    pub metrics: BTreeMap<String, MetricRecord>,
    /// Set while the item is admitted onto the aliases pre-queue; cleared
    /// once the orchestrator has picked it up.
    pub needs_aliases: Option<DateTime<Utc>>,
}

impl Item {
    /// Creates a fresh item with one or more seed aliases, immediately
    /// marked as needing admission into the pipeline.
    pub fn new(tiid: impl Into<String>, seed_aliases: impl IntoIterator<Item = (String, String)>, now: DateTime<Utc>) -> Self {
        let mut aliases = AliasSet::new();
        aliases.add_all(seed_aliases);
        Self {
            tiid: tiid.into(),
            created: now,
            last_modified: now,
            aliases,
            biblio: BTreeMap::new(),
            metrics: BTreeMap::new(),
            needs_aliases: Some(now),
        }
    }

    pub fn genre(&self) -> Genre {
        Genre::from_aliases(&self.aliases)
    }

    /// Merges provider-returned aliases per §4.7's aliases rule: additive
    /// insertion for every namespace, except that a namespace carrying a
    /// single scalar value (e.g. a date) is overwritten by a new scalar
    /// rather than accumulated.
    pub fn merge_aliases(&mut self, new_aliases: &AliasSet, now: DateTime<Utc>) {
        for ns in new_aliases.namespaces() {
            let incoming = new_aliases.ids_for(ns);
            let existing_is_scalar = self.aliases.ids_for(ns).len() <= 1;
            if let ([scalar], true) = (incoming, existing_is_scalar) {
                self.aliases.overwrite_scalar(ns, scalar.clone());
            } else {
                for id in incoming {
                    self.aliases.add(ns, id.clone());
                }
            }
        }
        self.last_modified = now;
    }

    /// First-writer-wins biblio merge: existing keys are never overwritten.
    pub fn merge_biblio(&mut self, new_biblio: BTreeMap<String, Value>, now: DateTime<Utc>) {
        let mut changed = false;
        for (key, value) in new_biblio {
            if let std::collections::btree_map::Entry::Vacant(entry) = self.biblio.entry(key) {
                entry.insert(value);
                changed = true;
            }
        }
        if changed {
            self.last_modified = now;
        }
    }

    /// Appends metric observations. An empty `new_metrics` map leaves the
    /// item untouched, per the merge rule's "providers contributing nothing
    /// must not modify the item" clause.
    pub fn merge_metrics(
        &mut self,
        new_metrics: Vec<(String, Option<String>, f64)>,
        now: DateTime<Utc>,
    ) {
        if new_metrics.is_empty() {
            return;
        }
        for (metric_name, provenance_url, value) in new_metrics {
            self.metrics
                .entry(metric_name)
                .and_modify(|existing| existing.record(provenance_url.clone(), now, value))
                .or_insert_with(|| MetricRecord::new(provenance_url, now, value));
        }
        self.last_modified = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn biblio_merge_is_first_writer_wins() {
        let mut item = Item::new("tiid1", [("doi".to_string(), "10.1/a".to_string())], now());
        let mut first = BTreeMap::new();
        first.insert("year".to_string(), json!("2010"));
        item.merge_biblio(first, now());

        let mut second = BTreeMap::new();
        second.insert("year".to_string(), json!("2099"));
        item.merge_biblio(second, now());

        assert_eq!(item.biblio.get("year"), Some(&json!("2010")));
    }

    #[test]
    fn merge_aliases_overwrites_a_scalar_namespace() {
        let mut item = Item::new("tiid1", [("doi".to_string(), "10.1/a".to_string())], now());
        let mut first = AliasSet::new();
        first.add("year", "2019");
        item.merge_aliases(&first, now());

        let mut second = AliasSet::new();
        second.add("year", "2020");
        item.merge_aliases(&second, now());

        assert_eq!(item.aliases.ids_for("year"), &["2020".to_string()]);
    }

    #[test]
    fn merge_aliases_stays_additive_for_plural_namespaces() {
        let mut item = Item::new("tiid1", [("doi".to_string(), "10.1/a".to_string())], now());
        let mut first = AliasSet::new();
        first.add("url", "http://a");
        first.add("url", "http://b");
        item.merge_aliases(&first, now());

        let mut second = AliasSet::new();
        second.add("url", "http://c");
        item.merge_aliases(&second, now());

        assert_eq!(
            item.aliases.ids_for("url"),
            &["http://a".to_string(), "http://b".to_string(), "http://c".to_string()]
        );
    }

    #[test]
    fn empty_metrics_do_not_touch_item() {
        let mut item = Item::new("tiid1", [("doi".to_string(), "10.1/a".to_string())], now());
        let before = item.last_modified;
        item.merge_metrics(vec![], now());
        assert_eq!(item.last_modified, before);
        assert!(item.metrics.is_empty());
    }

    #[test]
    fn repeated_metric_merge_appends_history() {
        let mut item = Item::new("tiid1", [("doi".to_string(), "10.1/a".to_string())], now());
        let later = now() + chrono::Duration::hours(1);
        item.merge_metrics(
            vec![("wikipedia:mentions".to_string(), None, 3.0)],
            now(),
        );
        item.merge_metrics(
            vec![("wikipedia:mentions".to_string(), None, 5.0)],
            later,
        );
        let metric = &item.metrics["wikipedia:mentions"];
        assert_eq!(metric.values.raw, 5.0);
        assert_eq!(metric.values.raw_history.len(), 2);
    }

    #[test]
    fn genre_derives_from_aliases() {
        let item = Item::new(
            "tiid1",
            [("doi".to_string(), "10.5061/dryad.7898".to_string())],
            now(),
        );
        assert_eq!(item.genre(), Genre::Dataset);

        let github_item = Item::new(
            "tiid2",
            [("url".to_string(), "https://github.com/owner/repo".to_string())],
            now(),
        );
        assert_eq!(github_item.genre(), Genre::Software);

        let slideshare_item = Item::new(
            "tiid3",
            [("url".to_string(), "https://www.slideshare.net/owner/deck".to_string())],
            now(),
        );
        assert_eq!(slideshare_item.genre(), Genre::Slides);
    }
}
