//! Photo → product labels → storefront URLs, optionally ranked by SEO score.

use serde::Serialize;
use tracing::{info, warn};

use crate::Result;
use crate::ranker::{SeoAnalyzer, WebsiteReport};
use crate::search::{WebSearch, search_or_empty};
use crate::vision::{ImageClassifier, top_labels};

/// Knobs for [`find_products`].
#[derive(Debug, Clone)]
pub struct ProductOptions {
    /// How many image labels to search for, clamped to 1..=5 (default: 3).
    pub top_k: usize,
    /// Maximum URLs gathered across all labels, clamped to 5..=30 (default: 12).
    pub max_urls: usize,
    /// Rank the gathered URLs by SEO score (default: true).
    pub rank: bool,
    /// Candidate labels; empty means the built-in product vocabulary.
    pub labels: Vec<String>,
}

impl Default for ProductOptions {
    fn default() -> Self {
        Self { top_k: 3, max_urls: 12, rank: true, labels: Vec::new() }
    }
}

impl ProductOptions {
    pub fn top_k(&self) -> usize {
        self.top_k.clamp(1, 5)
    }

    pub fn max_urls(&self) -> usize {
        self.max_urls.clamp(5, 30)
    }
}

/// Result of the image-to-storefront flow.
#[derive(Debug, Clone, Serialize)]
pub struct ProductReport {
    pub labels: Vec<String>,
    pub urls: Vec<String>,
    /// Present when ranking was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranked: Option<Vec<WebsiteReport>>,
}

/// Searches each label in turn, collecting unseen URLs until `max_urls` are found.
pub async fn collect_urls<S: WebSearch + ?Sized>(search: &S, labels: &[String], max_urls: usize) -> Vec<String> {
    let mut collected: Vec<String> = Vec::new();

    for label in labels {
        for url in search_or_empty(search, label, max_urls).await {
            if !collected.contains(&url) {
                collected.push(url);
            }
        }
        if collected.len() >= max_urls {
            break;
        }
    }

    collected.truncate(max_urls);
    collected
}

/// Runs the whole flow for one uploaded image.
pub async fn find_products<C, S>(
    classifier: &C,
    search: &S,
    analyzer: &SeoAnalyzer,
    image: &[u8],
    options: &ProductOptions,
) -> Result<ProductReport>
where
    C: ImageClassifier + ?Sized,
    S: WebSearch + ?Sized,
{
    let labels = top_labels(classifier, image, options.top_k(), &options.labels)?;
    info!(labels = ?labels, "detected product labels");
    Ok(products_for_labels(search, analyzer, labels, options).await)
}

/// Searches and optionally ranks storefronts for already-detected labels.
pub async fn products_for_labels<S: WebSearch + ?Sized>(
    search: &S,
    analyzer: &SeoAnalyzer,
    labels: Vec<String>,
    options: &ProductOptions,
) -> ProductReport {
    let urls = collect_urls(search, &labels, options.max_urls()).await;
    if urls.is_empty() {
        warn!("no storefront URLs found for detected labels");
    }

    let ranked = if options.rank && !urls.is_empty() {
        Some(analyzer.rank_urls(&urls, labels.first().map(String::as_str)).await)
    } else if options.rank {
        Some(Vec::new())
    } else {
        None
    };

    ProductReport { labels, urls, ranked }
}
