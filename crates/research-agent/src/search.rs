//! Web search backends.

mod tavily;

use std::fmt::{self, Display};
use std::str::FromStr;

use reqwest::StatusCode;
use serde::Deserialize;

pub use tavily::{TAVILY_SEARCH_URL, TavilyClient};

use crate::config::{AppConfig, ConfigError};

/// Source label of the placeholder backend's results.
pub const PLACEHOLDER_SOURCE: &str = "Web search results";

/// The error type for a search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The request could not be sent or its body could not be decoded.
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The search API answered with an error status.
    #[error("search API returned {status}: {body}")]
    Status {
        /// The HTTP status.
        status: StatusCode,
        /// The start of the response body.
        body: String,
    },
}

/// Which backend answers `web_search` calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum SearchProvider {
    /// The Tavily search API.
    Tavily,
    /// Canned results, for offline runs.
    #[default]
    Placeholder,
}

impl Display for SearchProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchProvider::Tavily => f.write_str("tavily"),
            SearchProvider::Placeholder => f.write_str("placeholder"),
        }
    }
}

impl FromStr for SearchProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tavily" => Ok(SearchProvider::Tavily),
            "placeholder" => Ok(SearchProvider::Placeholder),
            _ => Err("expected `tavily` or `placeholder`".to_owned()),
        }
    }
}

/// One hit returned by a search.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SearchResult {
    /// Page title.
    pub title: String,
    /// Page address. Empty for results that have none.
    #[serde(default)]
    pub url: String,
    /// Relevant excerpt.
    #[serde(default)]
    pub content: String,
    /// Full page text, if the backend returned it.
    #[serde(default)]
    pub raw_content: Option<String>,
}

impl SearchResult {
    /// Returns how this result is cited in a report.
    pub fn source(&self) -> String {
        if self.url.is_empty() {
            self.title.clone()
        } else {
            format!("{} ({})", self.title, self.url)
        }
    }
}

/// The results of one search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchResults {
    /// The query that was searched.
    pub query: String,
    /// Hits, best first.
    pub results: Vec<SearchResult>,
}

impl SearchResults {
    /// Renders the results as the text handed back to the model.
    pub fn to_tool_content(&self) -> String {
        if self.results.is_empty() {
            return format!("No results found for '{}'.", self.query);
        }
        let mut content = String::new();
        for (idx, result) in self.results.iter().enumerate() {
            if idx > 0 {
                content.push_str("\n\n");
            }
            if result.url.is_empty() {
                content.push_str(&result.content);
            } else {
                content.push_str(&format!(
                    "[{}] {}\nURL: {}\n{}",
                    idx + 1,
                    result.title,
                    result.url,
                    result.content
                ));
            }
        }
        content
    }

    /// Returns the sources of the results, in order.
    pub fn sources(&self) -> Vec<String> {
        self.results.iter().map(SearchResult::source).collect()
    }
}

/// A configured search backend.
#[derive(Clone, Debug)]
pub enum SearchBackend {
    /// Searches through Tavily.
    Tavily(TavilyClient),
    /// Answers every query with the same canned text.
    Placeholder,
}

impl SearchBackend {
    /// Creates the backend selected by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        match config.search_provider {
            SearchProvider::Placeholder => Ok(SearchBackend::Placeholder),
            SearchProvider::Tavily => {
                let api_key = config
                    .tavily_api_key
                    .clone()
                    .ok_or(ConfigError::MissingTavilyKey)?;
                Ok(SearchBackend::Tavily(
                    TavilyClient::new(api_key)
                        .with_max_results(config.max_results_per_query),
                ))
            }
        }
    }

    /// Returns which provider this backend is.
    pub fn provider(&self) -> SearchProvider {
        match self {
            SearchBackend::Tavily(_) => SearchProvider::Tavily,
            SearchBackend::Placeholder => SearchProvider::Placeholder,
        }
    }

    /// Searches the web for `query`.
    pub async fn search(&self, query: &str) -> Result<SearchResults, SearchError> {
        match self {
            SearchBackend::Tavily(client) => client.search(query).await,
            SearchBackend::Placeholder => Ok(placeholder_results(query)),
        }
    }
}

fn placeholder_results(query: &str) -> SearchResults {
    SearchResults {
        query: query.to_owned(),
        results: vec![SearchResult {
            title: PLACEHOLDER_SOURCE.to_owned(),
            url: String::new(),
            content: format!(
                "Results for '{query}': Found some information about this topic."
            ),
            raw_content: None,
        }],
    }
}
