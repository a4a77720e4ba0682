//! Wikipedia: counts mentions of an item's URL across Wikipedia articles,
//! via the MediaWiki search API. Applies to any item with a known `url`
//! alias, which is why it appears as a generic metrics fallback in the
//! roster (spec §8, scenario S1).

use std::time::Duration;

use altimetry_core::alias::AliasSet;
use altimetry_core::error::ProviderError;
use altimetry_core::provider::{MetricObservation, ProviderAdapter};
use async_trait::async_trait;
use serde_json::Value;

use crate::http;

const API_BASE: &str = "https://en.wikipedia.org/w/api.php";

pub struct Wikipedia {
    client: reqwest::Client,
}

impl Wikipedia {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http::client(timeout),
        }
    }
}

#[async_trait]
impl ProviderAdapter for Wikipedia {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    fn provides_metrics(&self) -> bool {
        true
    }

    fn is_relevant_alias(&self, alias: &(String, String)) -> bool {
        alias.0 == "url" || alias.0 == "doi"
    }

    async fn metrics(&self, current: &AliasSet) -> Result<Vec<MetricObservation>, ProviderError> {
        let needle = current
            .ids_for("url")
            .first()
            .or_else(|| current.ids_for("doi").first());
        let Some(needle) = needle else {
            return Ok(Vec::new());
        };

        let url = format!(
            "{API_BASE}?action=query&list=search&format=json&srsearch={}",
            urlencode(needle)
        );
        let Some(body) = http::get_json(&self.client, &url).await? else {
            return Ok(Vec::new());
        };
        let count = body
            .get("query")
            .and_then(|q| q.get("searchinfo"))
            .and_then(|s| s.get("totalhits"))
            .and_then(Value::as_f64)
            .ok_or_else(|| ProviderError::ContentMalformed("missing Wikipedia searchinfo".into()))?;

        if count == 0.0 {
            return Ok(Vec::new());
        }

        Ok(vec![MetricObservation {
            name: "mentions".to_string(),
            provenance_url: Some(format!(
                "https://en.wikipedia.org/w/index.php?search={}",
                urlencode(needle)
            )),
            value: count,
        }])
    }
}

fn urlencode(s: &str) -> String {
    s.replace(' ', "%20").replace(':', "%3A").replace('/', "%2F")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevant_to_url_and_doi() {
        let wikipedia = Wikipedia::new(Duration::from_secs(5));
        assert!(wikipedia.is_relevant_alias(&("url".to_string(), "http://x".to_string())));
        assert!(wikipedia.is_relevant_alias(&("doi".to_string(), "10.1/x".to_string())));
        assert!(!wikipedia.is_relevant_alias(&("pmid".to_string(), "1".to_string())));
    }
}
