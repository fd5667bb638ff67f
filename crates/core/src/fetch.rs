//! Page fetching from URLs and local files.
//!
//! Every call builds its own client and issues exactly one request; there is
//! no retry, pooling or caching.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::{Result, ScopeError};

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 10, user_agent: "Mozilla/5.0".to_string() }
    }
}

/// Parses and validates an http(s) URL.
pub fn parse_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim()).map_err(|e| ScopeError::InvalidUrl(format!("{}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ScopeError::InvalidUrl(format!(
            "unsupported scheme '{}' (include http:// or https://)",
            other
        ))),
    }
}

/// Fetches HTML content from a URL.
///
/// Performs a single GET request with a browser-like User-Agent. Redirects are
/// followed; any final status other than 2xx is reported as
/// [`ScopeError::HttpStatus`].
pub async fn fetch_url(url: &str, config: &FetchConfig) -> Result<String> {
    let parsed_url = parse_http_url(url)?;

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .build()
        .map_err(ScopeError::HttpError)?;

    debug!(url = %parsed_url, "fetching page");

    let response = client
        .get(parsed_url)
        .header("User-Agent", &config.user_agent)
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .map_err(|e| timeout_or_http(e, config.timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScopeError::HttpStatus { url: url.to_string(), status: status.as_u16() });
    }

    let content = response.text().await?;

    Ok(content)
}

/// Maps a reqwest error to [`ScopeError::Timeout`] when it was caused by the timeout.
pub(crate) fn timeout_or_http(err: reqwest::Error, timeout: u64) -> ScopeError {
    if err.is_timeout() { ScopeError::Timeout { timeout } } else { ScopeError::HttpError(err) }
}

/// Reads HTML content from a local file.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(ScopeError::FileNotFound(path_buf))
    } else {
        fs::read_to_string(&path_buf).map_err(ScopeError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 10);
        assert_eq!(config.user_agent, "Mozilla/5.0");
    }

    #[test]
    fn test_fetch_url_invalid() {
        let config = FetchConfig::default();
        let result = std::thread::spawn(move || {
            tokio::runtime::Runtime::new()
                .unwrap()
                .block_on(fetch_url("not-a-url", &config))
        })
        .join()
        .unwrap();

        assert!(matches!(result, Err(ScopeError::InvalidUrl(_))));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        assert!(matches!(parse_http_url("ftp://example.com/file"), Err(ScopeError::InvalidUrl(_))));
        assert!(parse_http_url("https://example.com/shop").is_ok());
        assert!(parse_http_url("  http://example.com  ").is_ok());
    }

    #[test]
    fn test_fetch_file_not_found() {
        let result = fetch_file("/nonexistent/path/file.html");
        assert!(matches!(result, Err(ScopeError::FileNotFound(_))));
    }
}
