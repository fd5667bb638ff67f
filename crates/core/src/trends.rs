//! Globally trending keywords from a news RSS feed.
//!
//! The feed is fetched once per call and reduced to its most frequent
//! keywords. Failures never propagate: the caller gets an empty list and a
//! warning in the log.

use std::time::Duration;

use quick_xml::Reader;
use quick_xml::events::Event;
use reqwest::Client;
use tracing::{debug, warn};

use crate::fetch::timeout_or_http;
use crate::keywords::{DEFAULT_MAX_KEYWORDS, extract_keywords};
use crate::{Result, ScopeError};

/// Bing News RSS search for top trending stories.
pub const DEFAULT_TRENDS_URL: &str = "https://www.bing.com/news/search?q=top+trending&format=rss";

/// Client for the trending-news feed.
#[derive(Debug, Clone)]
pub struct TrendsClient {
    client: Client,
    feed_url: String,
    timeout: u64,
}

impl Default for TrendsClient {
    fn default() -> Self {
        Self::new(DEFAULT_TRENDS_URL, 10)
    }
}

impl TrendsClient {
    pub fn new(feed_url: impl Into<String>, timeout: u64) -> Self {
        Self { client: Client::new(), feed_url: feed_url.into(), timeout }
    }

    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    /// Fetches the feed and returns its top keywords, or an empty list on any failure.
    pub async fn fetch(&self) -> Vec<String> {
        match self.try_fetch().await {
            Ok(keywords) => {
                debug!(count = keywords.len(), "trending keywords loaded");
                keywords
            }
            Err(e) => {
                warn!(feed = %self.feed_url, error = %e, "failed to fetch trending keywords");
                Vec::new()
            }
        }
    }

    /// Fetches the feed and returns its top keywords.
    pub async fn try_fetch(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(&self.feed_url)
            .timeout(Duration::from_secs(self.timeout))
            .send()
            .await
            .map_err(|e| timeout_or_http(e, self.timeout))?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(ScopeError::HttpStatus { url: self.feed_url.clone(), status: status.as_u16() });
        }

        let body = response.text().await?;
        trending_keywords_from_feed(&body)
    }
}

/// Reduces an RSS document to the top keywords across all `<title>` texts.
pub fn trending_keywords_from_feed(xml: &str) -> Result<Vec<String>> {
    let titles = parse_feed_titles(xml)?;
    Ok(extract_keywords(&titles.join(" "), DEFAULT_MAX_KEYWORDS))
}

/// Collects the text of every `<title>` element, channel title included.
pub fn parse_feed_titles(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut titles = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"title" => {
                current = Some(String::new());
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"title" => {
                if let Some(title) = current.take() {
                    titles.push(title);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(title) = current.as_mut() {
                    let text = t.unescape().map_err(|e| ScopeError::FeedError(e.to_string()))?;
                    title.push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(title) = current.as_mut() {
                    title.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ScopeError::FeedError(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(titles)
}
