//! Google PageSpeed Insights performance score.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::fetch::{parse_http_url, timeout_or_http};
use crate::metrics::round2;
use crate::{Result, ScopeError};

pub const DEFAULT_PAGESPEED_ENDPOINT: &str = "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

const SERVICE: &str = "pagespeed";

#[derive(Debug, Deserialize)]
struct PageSpeedResponse {
    #[serde(rename = "lighthouseResult")]
    lighthouse_result: Option<LighthouseResult>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct LighthouseResult {
    categories: Categories,
}

#[derive(Debug, Deserialize)]
struct Categories {
    performance: Option<Category>,
}

#[derive(Debug, Deserialize)]
struct Category {
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// Client for the PageSpeed Insights v5 API.
#[derive(Debug, Clone)]
pub struct PageSpeedClient {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    timeout: u64,
}

impl PageSpeedClient {
    /// Creates a client; `None` or a blank key disables lookups.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: DEFAULT_PAGESPEED_ENDPOINT.to_string(),
            timeout: 60,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Performance score (0–100, 2 dp) for `url`, or `None` when unavailable.
    pub async fn score(&self, url: &str) -> Option<f64> {
        if self.api_key.is_none() {
            debug!("no PageSpeed API key configured, skipping");
            return None;
        }

        match self.performance_score(url).await {
            Ok(score) => Some(score),
            Err(e) => {
                warn!(url, error = %e, "PageSpeed lookup failed");
                None
            }
        }
    }

    /// Runs one PageSpeed analysis and returns the Lighthouse performance score.
    pub async fn performance_score(&self, url: &str) -> Result<f64> {
        let key = self.api_key.as_deref().ok_or(ScopeError::MissingApiKey { service: SERVICE })?;
        parse_http_url(url)?;

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("url", url), ("key", key)])
            .timeout(Duration::from_secs(self.timeout))
            .send()
            .await
            .map_err(|e| timeout_or_http(e, self.timeout))?;

        let body = response.text().await?;
        performance_score_from_json(&body)
    }
}

/// Extracts `lighthouseResult.categories.performance.score × 100` from an API response.
pub fn performance_score_from_json(body: &str) -> Result<f64> {
    let parsed: PageSpeedResponse = serde_json::from_str(body)?;

    if let Some(error) = parsed.error {
        return Err(ScopeError::Api {
            service: SERVICE,
            message: error.message.unwrap_or_else(|| "unknown error".to_string()),
        });
    }

    parsed
        .lighthouse_result
        .and_then(|r| r.categories.performance)
        .and_then(|p| p.score)
        .map(|score| round2(score * 100.0))
        .ok_or_else(|| ScopeError::Api { service: SERVICE, message: "response has no performance score".to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_from_json() {
        let body = r#"{"lighthouseResult":{"categories":{"performance":{"id":"performance","score":0.873}}}}"#;
        assert_eq!(performance_score_from_json(body).unwrap(), 87.3);
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid."}}"#;
        let err = performance_score_from_json(body).unwrap_err();
        assert!(err.to_string().contains("API key not valid."));
    }

    #[test]
    fn test_missing_score() {
        let body = r#"{"lighthouseResult":{"categories":{"performance":{"score":null}}}}"#;
        assert!(matches!(performance_score_from_json(body), Err(ScopeError::Api { .. })));
    }

    #[test]
    fn test_blank_key_disables_client() {
        assert!(!PageSpeedClient::new(Some("  ".to_string())).has_api_key());
        assert!(PageSpeedClient::new(Some("abc".to_string())).has_api_key());
    }

    #[tokio::test]
    async fn test_score_without_key_is_none() {
        let client = PageSpeedClient::new(None);
        assert_eq!(client.score("https://example.com").await, None);
    }
}
