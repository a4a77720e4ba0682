//! Mendeley: reader-count and readership-demographic metrics, looked up by
//! DOI against the Mendeley Catalog API.

use std::time::Duration;

use altimetry_core::alias::AliasSet;
use altimetry_core::error::ProviderError;
use altimetry_core::provider::{MetricObservation, ProviderAdapter};
use async_trait::async_trait;
use serde_json::Value;

use crate::http;

const API_BASE: &str = "https://api.mendeley.com/catalog";

pub struct Mendeley {
    client: reqwest::Client,
}

impl Mendeley {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http::client(timeout),
        }
    }
}

fn observation(name: &str, value: &Value, provenance_url: &str) -> Option<MetricObservation> {
    let value = match value {
        Value::Number(n) => n.as_f64()?,
        Value::Array(items) => items.len() as f64,
        _ => return None,
    };
    Some(MetricObservation {
        name: name.to_string(),
        provenance_url: Some(provenance_url.to_string()),
        value,
    })
}

#[async_trait]
impl ProviderAdapter for Mendeley {
    fn name(&self) -> &'static str {
        "mendeley"
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
        let mendeley_url = body
            .get("mendeley_url")
            .and_then(Value::as_str)
            .unwrap_or(&url)
            .to_string();
        let Some(stats) = body.get("reader_count_by_academic_status") else {
            return Ok(Vec::new());
        };

        let mut observations = Vec::new();
        if let Some(readers) = body.get("reader_count") {
            if let Some(o) = observation("readers", readers, &mendeley_url) {
                observations.push(o);
            }
        }
        if let Some(o) = observation("career_stage", stats, &mendeley_url) {
            observations.push(o);
        }
        if let Some(country) = body.get("reader_count_by_country") {
            if let Some(o) = observation("country", country, &mendeley_url) {
                observations.push(o);
            }
        }
        if let Some(groups) = body.get("groups").and_then(Value::as_array) {
            observations.push(MetricObservation {
                name: "groups".to_string(),
                provenance_url: Some(mendeley_url.clone()),
                value: groups.len() as f64,
            });
        }
        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevant_to_doi_only() {
        let mendeley = Mendeley::new(Duration::from_secs(5));
        assert!(mendeley.is_relevant_alias(&("doi".to_string(), "10.1/x".to_string())));
        assert!(!mendeley.is_relevant_alias(&("url".to_string(), "http://x".to_string())));
    }
}
