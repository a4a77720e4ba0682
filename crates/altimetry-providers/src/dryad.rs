//! Dryad: the data-repository provider for Dryad DOIs
//! (`10.5061/dryad.*`). Contributes both aliases (a resolvable URL, the
//! dataset title) and biblio (publication year, authors).

use std::collections::BTreeMap;
use std::time::Duration;

use altimetry_core::alias::AliasSet;
use altimetry_core::error::ProviderError;
use altimetry_core::provider::ProviderAdapter;
use async_trait::async_trait;
use serde_json::Value;

use crate::http;

const API_BASE: &str = "https://datadryad.org/api/v2/datasets";

pub struct Dryad {
    client: reqwest::Client,
}

impl Dryad {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http::client(timeout),
        }
    }

    fn doi(&self, aliases: &AliasSet) -> Option<String> {
        aliases
            .ids_for("doi")
            .iter()
            .find(|id| id.starts_with("10.5061/dryad"))
            .cloned()
    }

    async fn fetch(&self, doi: &str) -> Result<Option<Value>, ProviderError> {
        let url = format!("{API_BASE}/doi:{}", urlencode(doi));
        http::get_json(&self.client, &url).await
    }
}

fn urlencode(s: &str) -> String {
    s.replace('/', "%2F")
}

#[async_trait]
impl ProviderAdapter for Dryad {
    fn name(&self) -> &'static str {
        "dryad"
    }

    fn provides_aliases(&self) -> bool {
        true
    }

    fn provides_biblio(&self) -> bool {
        true
    }

    fn is_relevant_alias(&self, alias: &(String, String)) -> bool {
        alias.0 == "doi" && alias.1.starts_with("10.5061/dryad")
    }

    async fn aliases(&self, current: &AliasSet) -> Result<AliasSet, ProviderError> {
        let Some(doi) = self.doi(current) else {
            return Ok(AliasSet::new());
        };
        let mut found = AliasSet::new();
        let Some(doc) = self.fetch(&doi).await? else {
            return Ok(found);
        };
        if let Some(title) = doc.get("title").and_then(Value::as_str) {
            found.add("title", title.to_string());
        }
        found.add("url", format!("https://doi.org/{doi}"));
        Ok(found)
    }

    async fn biblio(&self, current: &AliasSet) -> Result<BTreeMap<String, Value>, ProviderError> {
        let Some(doi) = self.doi(current) else {
            return Ok(BTreeMap::new());
        };
        let Some(doc) = self.fetch(&doi).await? else {
            return Ok(BTreeMap::new());
        };
        let mut biblio = BTreeMap::new();
        if let Some(year) = doc.get("publicationYear").and_then(Value::as_str) {
            biblio.insert("year".to_string(), Value::String(year.to_string()));
        }
        if let Some(authors) = doc.get("authors").cloned() {
            biblio.insert("authors".to_string(), authors);
        }
        Ok(biblio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevant_only_to_dryad_doi_prefix() {
        let dryad = Dryad::new(Duration::from_secs(5));
        assert!(dryad.is_relevant_alias(&("doi".to_string(), "10.5061/dryad.7898".to_string())));
        assert!(!dryad.is_relevant_alias(&("doi".to_string(), "10.1371/journal.pone.1".to_string())));
        assert!(!dryad.is_relevant_alias(&("pmid".to_string(), "123".to_string())));
    }
}
