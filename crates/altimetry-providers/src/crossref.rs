//! CrossRef: bibliographic metadata lookup for any DOI via the public
//! CrossRef REST API (`https://api.crossref.org/works/{doi}`).

use std::collections::BTreeMap;
use std::time::Duration;

use altimetry_core::alias::AliasSet;
use altimetry_core::error::ProviderError;
use altimetry_core::provider::ProviderAdapter;
use async_trait::async_trait;
use serde_json::Value;

use crate::http;

const API_BASE: &str = "https://api.crossref.org/works";

pub struct CrossRef {
    client: reqwest::Client,
}

impl CrossRef {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http::client(timeout),
        }
    }
}

fn authors_from_message(message: &Value) -> Option<Value> {
    let authors = message.get("author")?.as_array()?;
    let names: Vec<Value> = authors
        .iter()
        .filter_map(|a| {
            let given = a.get("given").and_then(Value::as_str).unwrap_or("");
            let family = a.get("family").and_then(Value::as_str).unwrap_or("");
            if family.is_empty() {
                None
            } else {
                Some(Value::String(format!("{given} {family}").trim().to_string()))
            }
        })
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(Value::Array(names))
    }
}

#[async_trait]
impl ProviderAdapter for CrossRef {
    fn name(&self) -> &'static str {
        "crossref"
    }

    fn provides_biblio(&self) -> bool {
        true
    }

    fn is_relevant_alias(&self, alias: &(String, String)) -> bool {
        alias.0 == "doi"
    }

    async fn biblio(&self, current: &AliasSet) -> Result<BTreeMap<String, Value>, ProviderError> {
        let Some(doi) = current.ids_for("doi").first() else {
            return Ok(BTreeMap::new());
        };
        let url = format!("{API_BASE}/{}", doi.replace('/', "%2F"));
        let Some(body) = http::get_json(&self.client, &url).await? else {
            return Ok(BTreeMap::new());
        };
        let message = body
            .get("message")
            .ok_or_else(|| ProviderError::ContentMalformed("missing CrossRef message field".into()))?;

        let mut biblio = BTreeMap::new();
        if let Some(title) = message.get("title").and_then(Value::as_array).and_then(|t| t.first()) {
            biblio.insert("title".to_string(), title.clone());
        }
        if let Some(container) = message
            .get("container-title")
            .and_then(Value::as_array)
            .and_then(|t| t.first())
        {
            biblio.insert("journal".to_string(), container.clone());
        }
        if let Some(year) = message
            .get("published-print")
            .or_else(|| message.get("published-online"))
            .and_then(|d| d.get("date-parts"))
            .and_then(Value::as_array)
            .and_then(|parts| parts.first())
            .and_then(Value::as_array)
            .and_then(|parts| parts.first())
        {
            biblio.insert("year".to_string(), Value::String(year.to_string()));
        }
        if let Some(authors) = authors_from_message(message) {
            biblio.insert("authors".to_string(), authors);
        }
        Ok(biblio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevant_to_any_doi() {
        let crossref = CrossRef::new(Duration::from_secs(5));
        assert!(crossref.is_relevant_alias(&("doi".to_string(), "10.1/anything".to_string())));
        assert!(!crossref.is_relevant_alias(&("pmid".to_string(), "123".to_string())));
    }
}
