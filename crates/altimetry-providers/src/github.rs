//! GitHub: resolves a `github.com` repository URL into its canonical
//! title and a stable API url alias, for items whose `url` alias points at
//! a GitHub repository (software genre, spec §3).

use std::time::Duration;

use altimetry_core::alias::AliasSet;
use altimetry_core::error::ProviderError;
use altimetry_core::provider::ProviderAdapter;
use async_trait::async_trait;
use serde_json::Value;

use crate::http;

pub struct GitHub {
    client: reqwest::Client,
}

impl GitHub {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http::client(timeout),
        }
    }

    fn repo_path(url: &str) -> Option<String> {
        let rest = url.split("github.com/").nth(1)?;
        let mut parts = rest.trim_end_matches('/').splitn(3, '/');
        let owner = parts.next()?;
        let repo = parts.next()?;
        Some(format!("{owner}/{repo}"))
    }
}

#[async_trait]
impl ProviderAdapter for GitHub {
    fn name(&self) -> &'static str {
        "github"
    }

    fn provides_aliases(&self) -> bool {
        true
    }

    fn is_relevant_alias(&self, alias: &(String, String)) -> bool {
        alias.0 == "url" && alias.1.contains("github.com/")
    }

    async fn aliases(&self, current: &AliasSet) -> Result<AliasSet, ProviderError> {
        let Some(repo_path) = current.ids_for("url").iter().find_map(|u| Self::repo_path(u)) else {
            return Ok(AliasSet::new());
        };
        let api_url = format!("https://api.github.com/repos/{repo_path}");
        let Some(body) = http::get_json(&self.client, &api_url).await? else {
            return Ok(AliasSet::new());
        };

        let mut found = AliasSet::new();
        if let Some(name) = body.get("full_name").and_then(Value::as_str) {
            found.add("title", name.to_string());
        }
        if let Some(html_url) = body.get("html_url").and_then(Value::as_str) {
            found.add("url", html_url.to_string());
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relevant_only_to_github_urls() {
        let github = GitHub::new(Duration::from_secs(5));
        assert!(github.is_relevant_alias(&(
            "url".to_string(),
            "https://github.com/rust-lang/rust".to_string()
        )));
        assert!(!github.is_relevant_alias(&("url".to_string(), "https://example.com".to_string())));
    }

    #[test]
    fn extracts_owner_and_repo() {
        assert_eq!(
            GitHub::repo_path("https://github.com/rust-lang/rust/blob/main/README.md"),
            Some("rust-lang/rust".to_string())
        );
        assert_eq!(GitHub::repo_path("https://example.com"), None);
    }
}
