//! Bibtex: parses a raw BibTeX entry stashed under the item's `bibtex`
//! alias namespace directly into biblio fields. No network I/O — the
//! entry text arrives with the submission.

use std::collections::BTreeMap;

use altimetry_core::alias::AliasSet;
use altimetry_core::error::ProviderError;
use altimetry_core::provider::ProviderAdapter;
use async_trait::async_trait;
use serde_json::Value;

#[derive(Default)]
pub struct Bibtex;

impl Bibtex {
    pub fn new() -> Self {
        Self
    }

    /// Extracts `key = {value}` or `key = "value"` pairs from a single
    /// BibTeX entry. Best-effort: malformed entries simply yield fewer
    /// fields rather than an error, since partial biblio is still useful.
    fn parse(entry: &str) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        for line in entry.lines() {
            let line = line.trim().trim_end_matches(',');
            let Some((key, rest)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = rest
                .trim()
                .trim_start_matches('{')
                .trim_end_matches('}')
                .trim_start_matches('"')
                .trim_end_matches('"')
                .trim();
            if !key.is_empty() && !value.is_empty() {
                fields.insert(key, value.to_string());
            }
        }
        fields
    }
}

#[async_trait]
impl ProviderAdapter for Bibtex {
    fn name(&self) -> &'static str {
        "bibtex"
    }

    fn provides_biblio(&self) -> bool {
        true
    }

    fn is_relevant_alias(&self, alias: &(String, String)) -> bool {
        alias.0 == "bibtex"
    }

    async fn biblio(&self, current: &AliasSet) -> Result<BTreeMap<String, Value>, ProviderError> {
        let Some(entry) = current.ids_for("bibtex").first() else {
            return Ok(BTreeMap::new());
        };
        Ok(Self::parse(entry)
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_braced_and_quoted_fields() {
        let entry = "title = {A Paper},\nyear = \"2019\",\nauthor = {A. Author}";
        let fields = Bibtex::parse(entry);
        assert_eq!(fields.get("title"), Some(&"A Paper".to_string()));
        assert_eq!(fields.get("year"), Some(&"2019".to_string()));
        assert_eq!(fields.get("author"), Some(&"A. Author".to_string()));
    }

    #[test]
    fn relevant_only_to_bibtex_namespace() {
        let bibtex = Bibtex::new();
        assert!(bibtex.is_relevant_alias(&("bibtex".to_string(), "x".to_string())));
        assert!(!bibtex.is_relevant_alias(&("doi".to_string(), "x".to_string())));
    }
}
