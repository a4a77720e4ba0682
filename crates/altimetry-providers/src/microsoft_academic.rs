//! Microsoft Academic: citation counts looked up by DOI. The original
//! service matched on title because Microsoft Academic's search only
//! indexed titles; the modern Microsoft Academic Graph REST surface
//! indexes DOI directly, so this adapter is relevant to `doi` aliases.

use std::time::Duration;

use altimetry_core::alias::AliasSet;
use altimetry_core::error::ProviderError;
use altimetry_core::provider::{MetricObservation, ProviderAdapter};
use async_trait::async_trait;
use serde_json::Value;

use crate::http;

const API_BASE: &str = "https://academic.microsoft.com/api/search";

pub struct MicrosoftAcademic {
    client: reqwest::Client,
}

impl MicrosoftAcademic {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http::client(timeout),
        }
    }
}

#[async_trait]
impl ProviderAdapter for MicrosoftAcademic {
    fn name(&self) -> &'static str {
        "microsoft_academic"
    }

    fn provides_metrics(&self) -> bool {
        true
    }

    fn is_relevant_alias(&self, alias: &(String, String)) -> bool {
        alias.0 == "doi"
    }

    async fn metrics(&self, current: &AliasSet) -> Result<Vec<MetricObservation>, ProviderError> {
        let Some(doi) = current.ids_for("doi").first() else {
            return Ok(Vec::new());
        };
        let url = format!("{API_BASE}?doi={}", doi.replace('/', "%2F"));
        let Some(body) = http::get_json(&self.client, &url).await? else {
            return Ok(Vec::new());
        };
        let Some(citations) = body.get("citationCount").and_then(Value::as_f64) else {
            return Ok(Vec::new());
        };
        if citations == 0.0 {
            return Ok(Vec::new());
        }

        let provenance_url = body
            .get("entityUrl")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(vec![MetricObservation {
            name: "citations".to_string(),
            provenance_url,
            value: citations,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevant_to_doi_only() {
        let microsoft = MicrosoftAcademic::new(Duration::from_secs(5));
        assert!(microsoft.is_relevant_alias(&("doi".to_string(), "10.1/x".to_string())));
        assert!(!microsoft.is_relevant_alias(&("pmid".to_string(), "1".to_string())));
    }
}
