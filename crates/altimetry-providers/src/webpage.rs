//! Webpage: the fallback alias resolver (spec §4.8 rule 2). When no other
//! provider can contribute aliases and no `url` is known yet, the sniffer
//! schedules this provider to try to turn *some* identifier into a
//! resolvable URL and a page title. Unlike the other providers, it
//! declares itself relevant to every alias — it is the catch-all, and a
//! namespace it cannot resolve into a URL is a permanent failure rather
//! than a skip (spec §8, scenario S2).

use std::time::Duration;

use altimetry_core::alias::AliasSet;
use altimetry_core::error::ProviderError;
use altimetry_core::provider::ProviderAdapter;
use async_trait::async_trait;

use crate::http;

pub struct Webpage {
    client: reqwest::Client,
}

impl Webpage {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http::client(timeout),
        }
    }

    /// Best-effort conversion of a known namespace into a dereferenceable
    /// URL. Namespaces this doesn't recognise have no canonical resolver.
    fn resolvable_url(current: &AliasSet) -> Option<String> {
        if let Some(url) = current.ids_for("url").first() {
            return Some(url.clone());
        }
        if let Some(doi) = current.ids_for("doi").first() {
            return Some(format!("https://doi.org/{doi}"));
        }
        if let Some(pmid) = current.ids_for("pmid").first() {
            return Some(format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/"));
        }
        None
    }
}

fn title_from_html(html: &str) -> Option<String> {
    let start = html.find("<title>")? + "<title>".len();
    let end = html[start..].find("</title>")? + start;
    Some(html[start..end].trim().to_string())
}

#[async_trait]
impl ProviderAdapter for Webpage {
    fn name(&self) -> &'static str {
        "webpage"
    }

    fn provides_aliases(&self) -> bool {
        true
    }

    fn is_relevant_alias(&self, _alias: &(String, String)) -> bool {
        true
    }

    async fn aliases(&self, current: &AliasSet) -> Result<AliasSet, ProviderError> {
        let Some(url) = Self::resolvable_url(current) else {
            return Err(ProviderError::ContentMalformed(
                "no namespace on this item resolves to a dereferenceable url".into(),
            ));
        };

        let mut found = AliasSet::new();
        found.add("url", url.clone());
        if let Some(page) = http::get_text(&self.client, &url).await? {
            if let Some(title) = title_from_html(&page) {
                found.add("title", title);
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevant_to_every_alias() {
        let webpage = Webpage::new(Duration::from_secs(5));
        assert!(webpage.is_relevant_alias(&("foo".to_string(), "bar".to_string())));
    }

    #[test]
    fn no_resolvable_url_for_unknown_namespace() {
        let mut aliases = AliasSet::new();
        aliases.add("foo", "bar");
        assert_eq!(Webpage::resolvable_url(&aliases), None);
    }

    #[test]
    fn doi_resolves_to_doi_org() {
        let mut aliases = AliasSet::new();
        aliases.add("doi", "10.1/x");
        assert_eq!(
            Webpage::resolvable_url(&aliases),
            Some("https://doi.org/10.1/x".to_string())
        );
    }
}
