//! Web search for candidate storefront URLs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::fetch::timeout_or_http;
use crate::{Result, ScopeError};

pub const DEFAULT_SERPAPI_ENDPOINT: &str = "https://serpapi.com/search.json";

const SERVICE: &str = "serpapi";

/// A search backend that maps a query to result links.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Returns up to `count` result URLs for `query`, best first.
    async fn search(&self, query: &str, count: usize) -> Result<Vec<String>>;
}

/// Runs a search, logging failures and returning no links instead.
pub async fn search_or_empty<S: WebSearch + ?Sized>(search: &S, query: &str, count: usize) -> Vec<String> {
    match search.search(query, count).await {
        Ok(links) => links,
        Err(e) => {
            warn!(query, error = %e, "web search failed");
            Vec::new()
        }
    }
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    link: Option<String>,
}

/// Google results through SerpApi.
#[derive(Debug, Clone)]
pub struct SerpApiClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    timeout: u64,
}

impl SerpApiClient {
    /// Creates a client; `None` or a blank key makes every search fail with
    /// [`ScopeError::MissingApiKey`].
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: DEFAULT_SERPAPI_ENDPOINT.to_string(),
            timeout: 30,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl WebSearch for SerpApiClient {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<String>> {
        let key = self.api_key.as_deref().ok_or(ScopeError::MissingApiKey { service: SERVICE })?;
        let num = count.to_string();

        debug!(query, count, "querying SerpApi");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("engine", "google"), ("q", query), ("num", num.as_str()), ("api_key", key)])
            .timeout(Duration::from_secs(self.timeout))
            .send()
            .await
            .map_err(|e| timeout_or_http(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScopeError::HttpStatus { url: self.endpoint.clone(), status: status.as_u16() });
        }

        let body = response.text().await?;
        organic_links(&body)
    }
}

/// Extracts `organic_results[].link` values that look like http(s) URLs,
/// de-duplicated in result order.
pub fn organic_links(body: &str) -> Result<Vec<String>> {
    let parsed: SerpResponse = serde_json::from_str(body)?;

    if let Some(message) = parsed.error {
        return Err(ScopeError::Api { service: SERVICE, message });
    }

    let mut links: Vec<String> = Vec::new();
    for link in parsed.organic_results.into_iter().filter_map(|r| r.link) {
        if link.starts_with("http") && !links.contains(&link) {
            links.push(link);
        }
    }

    Ok(links)
}
