//! Slideshare: resolves a `slideshare.net` deck URL into its title, for
//! items whose `url` alias points at a Slideshare deck (slides genre,
//! spec §3).

use std::time::Duration;

use altimetry_core::alias::AliasSet;
use altimetry_core::error::ProviderError;
use altimetry_core::provider::ProviderAdapter;
use async_trait::async_trait;

use crate::http;

pub struct Slideshare {
    client: reqwest::Client,
}

impl Slideshare {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http::client(timeout),
        }
    }
}

fn title_from_html(html: &str) -> Option<String> {
    let start = html.find("<title>")? + "<title>".len();
    let end = html[start..].find("</title>")? + start;
    Some(html[start..end].trim().to_string())
}

#[async_trait]
impl ProviderAdapter for Slideshare {
    fn name(&self) -> &'static str {
        "slideshare"
    }

    fn provides_aliases(&self) -> bool {
        true
    }

    fn is_relevant_alias(&self, alias: &(String, String)) -> bool {
        alias.0 == "url" && alias.1.contains("slideshare.net/")
    }

    async fn aliases(&self, current: &AliasSet) -> Result<AliasSet, ProviderError> {
        let Some(deck_url) = current
            .ids_for("url")
            .iter()
            .find(|u| u.contains("slideshare.net/"))
        else {
            return Ok(AliasSet::new());
        };

        let mut found = AliasSet::new();
        if let Some(page) = http::get_text(&self.client, deck_url).await? {
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
    fn relevant_only_to_slideshare_urls() {
        let slideshare = Slideshare::new(Duration::from_secs(5));
        assert!(slideshare.is_relevant_alias(&(
            "url".to_string(),
            "https://www.slideshare.net/someone/a-deck".to_string()
        )));
        assert!(!slideshare.is_relevant_alias(&("url".to_string(), "https://example.com".to_string())));
    }

    #[test]
    fn extracts_title_tag() {
        let html = "<html><head><title>  My Deck  </title></head></html>";
        assert_eq!(title_from_html(html), Some("My Deck".to_string()));
    }
}
