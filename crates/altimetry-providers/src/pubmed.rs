//! PubMed: resolves a PMID into its DOI and title via NCBI's ESummary
//! E-utility. Grounded in the same ESearch/EFetch family of endpoints used
//! elsewhere in this stack for bibliographic lookups.

use std::time::Duration;

use altimetry_core::alias::AliasSet;
use altimetry_core::error::ProviderError;
use altimetry_core::provider::ProviderAdapter;
use async_trait::async_trait;
use serde_json::Value;

use crate::http;

const ESUMMARY_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esummary.fcgi";

pub struct PubMed {
    client: reqwest::Client,
}

impl PubMed {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http::client(timeout),
        }
    }
}

#[async_trait]
impl ProviderAdapter for PubMed {
    fn name(&self) -> &'static str {
        "pubmed"
    }

    fn provides_aliases(&self) -> bool {
        true
    }

    fn is_relevant_alias(&self, alias: &(String, String)) -> bool {
        alias.0 == "pmid"
    }

    async fn aliases(&self, current: &AliasSet) -> Result<AliasSet, ProviderError> {
        let Some(pmid) = current.ids_for("pmid").first() else {
            return Ok(AliasSet::new());
        };
        let url = format!("{ESUMMARY_URL}?db=pubmed&id={pmid}&retmode=json");
        let Some(body) = http::get_json(&self.client, &url).await? else {
            return Ok(AliasSet::new());
        };

        let record = body
            .get("result")
            .and_then(|r| r.get(pmid))
            .ok_or_else(|| ProviderError::ContentMalformed("missing PubMed esummary result".into()))?;

        let mut found = AliasSet::new();
        if let Some(title) = record.get("title").and_then(Value::as_str) {
            found.add("title", title.to_string());
        }
        if let Some(ids) = record.get("articleids").and_then(Value::as_array) {
            for id in ids {
                let id_type = id.get("idtype").and_then(Value::as_str);
                let value = id.get("value").and_then(Value::as_str);
                if let (Some("doi"), Some(value)) = (id_type, value) {
                    found.add("doi", value.to_string());
                }
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevant_only_to_pmid() {
        let pubmed = PubMed::new(Duration::from_secs(5));
        assert!(pubmed.is_relevant_alias(&("pmid".to_string(), "123".to_string())));
        assert!(!pubmed.is_relevant_alias(&("doi".to_string(), "10.1/x".to_string())));
    }
}
