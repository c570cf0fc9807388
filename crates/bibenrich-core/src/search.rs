//! Web search fallback through the Google Custom Search JSON API.
//!
//! Used when a paper has no resolvable DOI or its landing page yielded no
//! metadata. Results are returned in the API's ranking order.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("search API key or engine id not configured")]
    MissingCredentials,
    #[error("search API returned HTTP {0}")]
    Status(u16),
    #[error("search request failed: {0}")]
    Transport(String),
    #[error("invalid search response: {0}")]
    Decode(String),
}

pub type SearchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<SearchHit>, SearchError>> + Send + 'a>>;

/// A web search backend returning ranked candidate pages.
pub trait SearchClient: Send + Sync {
    /// Run `query`, asking for at most `num_results` hits.
    fn search<'a>(&'a self, query: &'a str, num_results: usize) -> SearchFuture<'a>;
}

/// Response from the Custom Search JSON API. `items` is omitted when there
/// are no results.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Google Custom Search client.
pub struct GoogleSearch {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    cse_id: Option<String>,
    timeout: Duration,
}

impl GoogleSearch {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        cse_id: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            cse_id,
            timeout,
        }
    }

    /// True when both the API key and the engine id are set.
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.cse_id.is_some()
    }
}

/// Parse a Custom Search response body, dropping items without a link.
fn parse_search_response(body: &str) -> Result<Vec<SearchHit>, SearchError> {
    let data: SearchResponse =
        serde_json::from_str(body).map_err(|e| SearchError::Decode(e.to_string()))?;
    Ok(data
        .items
        .into_iter()
        .filter(|item| !item.link.is_empty())
        .map(|item| SearchHit {
            title: item.title,
            link: item.link,
            snippet: item.snippet,
        })
        .collect())
}

impl SearchClient for GoogleSearch {
    fn search<'a>(&'a self, query: &'a str, num_results: usize) -> SearchFuture<'a> {
        Box::pin(async move {
            let (Some(key), Some(cx)) = (self.api_key.as_deref(), self.cse_id.as_deref()) else {
                return Err(SearchError::MissingCredentials);
            };
            // The API accepts 1..=10 results per page
            let num = num_results.clamp(1, 10).to_string();

            let resp = self
                .client
                .get(&self.endpoint)
                .query(&[("key", key), ("cx", cx), ("q", query), ("num", num.as_str())])
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| SearchError::Transport(e.to_string()))?;

            if !resp.status().is_success() {
                return Err(SearchError::Status(resp.status().as_u16()));
            }

            let body = resp
                .text()
                .await
                .map_err(|e| SearchError::Transport(e.to_string()))?;
            let hits = parse_search_response(&body)?;
            tracing::debug!(query, hits = hits.len(), "search complete");
            Ok(hits)
        })
    }
}
