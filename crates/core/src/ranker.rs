//! The SEO pipeline: fetch, measure, compare with trends, score.
//!
//! # Example
//!
//! ```rust,no_run
//! use storescope_core::{SeoAnalyzer, SeoModel};
//!
//! # async fn example() -> storescope_core::Result<()> {
//! let analyzer = SeoAnalyzer::builder()
//!     .model(SeoModel::load("model/seo_model.txt")?)
//!     .build();
//!
//! let report = analyzer.analyze_website("https://example.com", Some("rings")).await?;
//! println!("{:?}", report.seo_score);
//! # Ok(())
//! # }
//! ```

use std::cmp::Ordering;

use serde::Serialize;
use tracing::{info, warn};

use crate::Result;
use crate::fetch::{FetchConfig, fetch_url};
use crate::keywords::compare_with_trends;
use crate::metrics::{SeoMetrics, analyze_html};
use crate::model::SeoModel;
use crate::pagespeed::PageSpeedClient;
use crate::trends::TrendsClient;

/// Everything learned about one URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebsiteReport {
    pub url: String,
    /// Model score in [0, 100]; `None` without a model or on prediction failure.
    pub seo_score: Option<f64>,
    /// PageSpeed performance score in [0, 100].
    pub pagespeed: Option<f64>,
    #[serde(rename = "meta")]
    pub metrics: SeoMetrics,
    pub keywords: Vec<String>,
    pub global_trends: Vec<String>,
    pub overlap: Vec<String>,
}

/// Runs the page analysis steps in sequence.
#[derive(Debug, Clone, Default)]
pub struct SeoAnalyzer {
    fetch: FetchConfig,
    trends: Option<TrendsClient>,
    pagespeed: Option<PageSpeedClient>,
    model: Option<SeoModel>,
}

impl SeoAnalyzer {
    pub fn builder() -> SeoAnalyzerBuilder {
        SeoAnalyzerBuilder::new()
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Trending keywords, or nothing when the trends lookup is disabled or fails.
    pub async fn trending_keywords(&self) -> Vec<String> {
        match &self.trends {
            Some(client) => client.fetch().await,
            None => Vec::new(),
        }
    }

    /// PageSpeed score for `url`, or `None` when disabled or unavailable.
    pub async fn pagespeed(&self, url: &str) -> Option<f64> {
        match &self.pagespeed {
            Some(client) => client.score(url).await,
            None => None,
        }
    }

    /// Model score clamped to [0, 100], or `None` without a usable prediction.
    pub fn score(&self, metrics: &SeoMetrics) -> Option<f64> {
        let model = self.model.as_ref()?;
        match model.predict(metrics) {
            Ok(score) if score.is_finite() => Some(score.clamp(0.0, 100.0)),
            Ok(score) => {
                warn!(score, "model returned a non-finite score");
                None
            }
            Err(e) => {
                warn!(error = %e, "SEO score prediction failed");
                None
            }
        }
    }

    /// Builds a report from already-fetched HTML.
    pub fn build_report(
        &self,
        url: &str,
        html: &str,
        keyword: Option<&str>,
        global_trends: &[String],
        pagespeed: Option<f64>,
    ) -> WebsiteReport {
        let analysis = analyze_html(html, keyword);
        let overlap = compare_with_trends(&analysis.keywords, global_trends);
        let seo_score = self.score(&analysis.metrics);

        WebsiteReport {
            url: url.to_string(),
            seo_score,
            pagespeed,
            metrics: analysis.metrics,
            keywords: analysis.keywords,
            global_trends: global_trends.to_vec(),
            overlap,
        }
    }

    /// Fetches and analyzes a single website.
    pub async fn analyze_website(&self, url: &str, keyword: Option<&str>) -> Result<WebsiteReport> {
        let trends = self.trending_keywords().await;
        self.analyze_with_trends(url, keyword, &trends).await
    }

    async fn analyze_with_trends(&self, url: &str, keyword: Option<&str>, trends: &[String]) -> Result<WebsiteReport> {
        let html = fetch_url(url, &self.fetch).await?;
        let pagespeed = self.pagespeed(url).await;
        Ok(self.build_report(url, &html, keyword, trends, pagespeed))
    }

    /// Analyzes each URL in turn and sorts the results by SEO score.
    ///
    /// URLs that cannot be fetched are logged and left out. Trending keywords
    /// are fetched once for the whole batch.
    pub async fn rank_urls(&self, urls: &[String], keyword_hint: Option<&str>) -> Vec<WebsiteReport> {
        let trends = self.trending_keywords().await;
        let mut reports = Vec::with_capacity(urls.len());

        for url in urls {
            match self.analyze_with_trends(url, keyword_hint, &trends).await {
                Ok(report) => reports.push(report),
                Err(e) => warn!(url = %url, error = %e, "skipping URL"),
            }
        }

        sort_by_seo_score(&mut reports);
        info!(analyzed = reports.len(), requested = urls.len(), "ranked URLs");
        reports
    }
}

/// Sorts by SEO score, highest first; unscored reports go last in their original order.
pub fn sort_by_seo_score(reports: &mut [WebsiteReport]) {
    reports.sort_by(|a, b| match (a.seo_score, b.seo_score) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Builder for [`SeoAnalyzer`].
///
/// Trends and PageSpeed lookups are off unless a client is supplied.
pub struct SeoAnalyzerBuilder {
    analyzer: SeoAnalyzer,
}

impl SeoAnalyzerBuilder {
    pub fn new() -> Self {
        Self { analyzer: SeoAnalyzer::default() }
    }

    pub fn fetch_config(mut self, config: FetchConfig) -> Self {
        self.analyzer.fetch = config;
        self
    }

    pub fn trends(mut self, client: TrendsClient) -> Self {
        self.analyzer.trends = Some(client);
        self
    }

    pub fn pagespeed(mut self, client: PageSpeedClient) -> Self {
        self.analyzer.pagespeed = Some(client);
        self
    }

    pub fn model(mut self, model: SeoModel) -> Self {
        self.analyzer.model = Some(model);
        self
    }

    pub fn maybe_model(mut self, model: Option<SeoModel>) -> Self {
        self.analyzer.model = model;
        self
    }

    pub fn build(self) -> SeoAnalyzer {
        self.analyzer
    }
}

impl Default for SeoAnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
