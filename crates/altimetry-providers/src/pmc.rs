//! PubMed Central: usage metrics (PDF downloads, abstract/fulltext views)
//! for items identified by PMID.

use std::time::Duration;

use altimetry_core::alias::AliasSet;
use altimetry_core::error::ProviderError;
use altimetry_core::provider::{MetricObservation, ProviderAdapter};
use async_trait::async_trait;
use serde_json::Value;

use crate::http;

const API_BASE: &str = "https://www.ncbi.nlm.nih.gov/pmc/utils/utagstats";

pub struct Pmc {
    client: reqwest::Client,
}

impl Pmc {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http::client(timeout),
        }
    }
}

const FIELDS: &[&str] = &[
    "pdf_downloads",
    "abstract_views",
    "fulltext_views",
    "unique_ip_views",
    "figure_views",
    "suppdata_views",
];

#[async_trait]
impl ProviderAdapter for Pmc {
    fn name(&self) -> &'static str {
        "pmc"
    }

    fn provides_metrics(&self) -> bool {
        true
    }

    fn is_relevant_alias(&self, alias: &(String, String)) -> bool {
        alias.0 == "pmid"
    }

    async fn metrics(&self, current: &AliasSet) -> Result<Vec<MetricObservation>, ProviderError> {
        let Some(pmid) = current.ids_for("pmid").first() else {
            return Ok(Vec::new());
        };
        let url = format!("{API_BASE}?id={pmid}&format=json");
        let Some(body) = http::get_json(&self.client, &url).await? else {
            return Ok(Vec::new());
        };
        let usage = body
            .get("usage")
            .ok_or_else(|| ProviderError::ContentMalformed("missing PMC usage field".into()))?;

        let provenance_url = format!("https://www.ncbi.nlm.nih.gov/pmc/articles/pmid/{pmid}/");
        let mut observations = Vec::new();
        for field in FIELDS {
            if let Some(value) = usage.get(field).and_then(Value::as_f64) {
                if value > 0.0 {
                    observations.push(MetricObservation {
                        name: field.to_string(),
                        provenance_url: Some(provenance_url.clone()),
                        value,
                    });
                }
            }
        }
        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevant_to_pmid_only() {
        let pmc = Pmc::new(Duration::from_secs(5));
        assert!(pmc.is_relevant_alias(&("pmid".to_string(), "123".to_string())));
        assert!(!pmc.is_relevant_alias(&("doi".to_string(), "10.1/x".to_string())));
    }
}
