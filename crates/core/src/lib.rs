//! Storefront SEO analysis.
//!
//! Fetches web pages, measures on-page SEO signals, compares page keywords with
//! trending topics and scores pages with a gradient-boosted regression model.
//! With the `clip` feature, product photos are labelled zero-shot and the labels
//! are used to discover and rank storefronts.

pub mod config;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod formatters;
pub mod keywords;
pub mod metrics;
pub mod model;
pub mod pagespeed;
pub mod parse;
pub mod products;
pub mod ranker;
pub mod search;
pub mod train;
pub mod trends;
pub mod vision;

pub use config::Settings;
pub use dataset::{Sample, generate, read_csv, train_test_split, write_csv};
pub use error::{Result, ScopeError};
pub use fetch::{FetchConfig, fetch_file, fetch_url, parse_http_url};
pub use formatters::{JsonConfig, JsonFormatter, TextConfig, TextFormatter};
pub use keywords::{compare_with_trends, extract_keywords};
pub use metrics::{PageAnalysis, SeoMetrics, analyze_html};
pub use model::{DEFAULT_MODEL_PATH, GbdtModel, SeoModel};
pub use pagespeed::PageSpeedClient;
pub use parse::Document;
pub use products::{ProductOptions, ProductReport, collect_urls, find_products, products_for_labels};
pub use ranker::{SeoAnalyzer, SeoAnalyzerBuilder, WebsiteReport, sort_by_seo_score};
pub use search::{SerpApiClient, WebSearch};
pub use train::{TrainConfig, rmse, train};
pub use trends::TrendsClient;
#[cfg(feature = "clip")]
pub use vision::ClipClassifier;
pub use vision::{ImageClassifier, LabelScore, rank_labels, top_labels};
