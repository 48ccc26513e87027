use std::fmt::{self, Debug};
use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{SearchError, SearchResult, SearchResults};

/// The Tavily search endpoint.
pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

const DEFAULT_MAX_RESULTS: usize = 5;
const MAX_ERROR_BODY: usize = 512;

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// A minimal client for Tavily's search endpoint.
#[derive(Clone)]
pub struct TavilyClient {
    client: Client,
    api_key: Arc<str>,
    endpoint: Arc<str>,
    max_results: usize,
}

impl TavilyClient {
    /// Creates a client using `api_key`.
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            client: Client::new(),
            api_key: Arc::from(api_key.into()),
            endpoint: Arc::from(TAVILY_SEARCH_URL),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Sends searches to `endpoint` instead of [`TAVILY_SEARCH_URL`].
    #[inline]
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Arc::from(endpoint.into());
        self
    }

    /// Sets how many results a search asks for.
    #[inline]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Searches for `query`.
    pub async fn search(&self, query: &str) -> Result<SearchResults, SearchError> {
        debug!("searching tavily for {query:?}");
        let resp = self
            .client
            .post(&*self.endpoint)
            .json(&SearchRequest {
                api_key: &self.api_key,
                query,
                max_results: self.max_results,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status,
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let SearchResponse { results } = resp.json().await?;
        debug!("tavily returned {} result(s)", results.len());
        Ok(SearchResults {
            query: query.to_owned(),
            results,
        })
    }
}

impl Debug for TavilyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TavilyClient")
            .field("endpoint", &self.endpoint)
            .field("max_results", &self.max_results)
            .finish_non_exhaustive()
    }
}
