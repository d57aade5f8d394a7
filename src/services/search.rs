//! Web search through a custom-search JSON API.
//!
//! The API key and the search-engine id live in two single-line files on
//! disk and are read on every query, so rotating them needs no restart.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use crate::configuration::SearchSettings;
use crate::errors::SearchError;

/// Number of results requested from the API.
const RESULT_COUNT: &str = "10";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

struct Credentials {
    api_key: String,
    search_engine_id: String,
}

#[derive(Clone, Debug)]
pub struct SearchService {
    http: reqwest::Client,
    endpoint: Url,
    api_key_path: PathBuf,
    search_engine_id_path: PathBuf,
}

impl SearchService {
    pub fn new(settings: &SearchSettings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            endpoint: Url::parse(&settings.endpoint)?,
            api_key_path: settings.api_key_path.clone(),
            search_engine_id_path: settings.search_engine_id_path.clone(),
        })
    }

    async fn credentials(&self) -> Result<Credentials, SearchError> {
        let api_key = read_first_line(&self.api_key_path).await?;
        let search_engine_id = read_first_line(&self.search_engine_id_path).await?;

        if api_key.is_empty() && search_engine_id.is_empty() {
            return Err(SearchError::Credentials);
        }

        Ok(Credentials {
            api_key,
            search_engine_id,
        })
    }

    /// Fails when the credential files are missing or both empty.
    pub async fn check_credentials(&self) -> Result<(), SearchError> {
        self.credentials().await.map(|_| ())
    }

    /// Runs the query and reports every failure.
    #[instrument(name = "Service: Web search", skip(self))]
    pub async fn try_query(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let credentials = self.credentials().await?;

        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&[
                ("q", query),
                ("key", credentials.api_key.as_str()),
                ("cx", credentials.search_engine_id.as_str()),
                ("num", RESULT_COUNT),
            ])
            .send()
            .await
            .map_err(SearchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status));
        }

        let body: RawResponse = response.json().await.map_err(SearchError::Decode)?;
        Ok(map_items(body.items))
    }

    /// Best-effort variant of [`try_query`](Self::try_query): when the remote
    /// service fails the query yields no results. Missing credentials are
    /// still reported.
    pub async fn run_query(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        match self.try_query(query).await {
            Err(e) if e.is_service_failure() => {
                tracing::warn!("Web search failed, returning no results: {:?}", e);
                Ok(Vec::new())
            }
            other => other,
        }
    }
}

async fn read_first_line(path: &Path) -> Result<String, SearchError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SearchError::Config {
            path: path.display().to_string(),
            source,
        })?;
    Ok(contents.lines().next().unwrap_or_default().trim().to_string())
}

/// Keeps the items that carry a title, link and snippet.
fn map_items(items: Vec<serde_json::Value>) -> Vec<SearchResult> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<SearchResult>(item) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!("Skipping malformed search item: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn items_map_to_title_link_snippet() {
        let items = vec![
            json!({
                "kind": "customsearch#result",
                "title": "Rust",
                "link": "https://www.rust-lang.org/",
                "snippet": "A language empowering everyone",
                "displayLink": "www.rust-lang.org"
            }),
            json!({ "title": "No link", "snippet": "..." }),
        ];

        assert_eq!(
            map_items(items),
            vec![SearchResult {
                title: "Rust".into(),
                link: "https://www.rust-lang.org/".into(),
                snippet: "A language empowering everyone".into(),
            }]
        );
    }

    #[test]
    fn response_without_items_is_empty() {
        let body: RawResponse = serde_json::from_value(json!({ "kind": "customsearch#search" }))
            .expect("valid response");
        assert!(map_items(body.items).is_empty());
    }
}
