//! On-page SEO metrics.
//!
//! [`analyze_html`] turns one HTML page into the five model features plus the
//! page's top keywords.

use serde::{Deserialize, Serialize};

use crate::keywords::{DEFAULT_MAX_KEYWORDS, count_occurrences, extract_keywords, word_count};
use crate::parse::Document;

/// Number of scalar features the SEO model consumes.
pub const FEATURE_COUNT: usize = 5;

/// Feature names in model column order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] =
    ["Word_Count", "Keyword_Density", "Meta_Title_Length", "Meta_Desc_Length", "Alt_Tag_Percent"];

/// The five on-page metrics fed to the SEO model.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SeoMetrics {
    #[serde(rename = "Word_Count")]
    pub word_count: usize,
    /// Percentage of words matching the focus keyword, 2 dp.
    #[serde(rename = "Keyword_Density")]
    pub keyword_density: f64,
    /// Characters in `<title>`.
    #[serde(rename = "Meta_Title_Length")]
    pub meta_title_length: usize,
    /// Characters in the meta description.
    #[serde(rename = "Meta_Desc_Length")]
    pub meta_desc_length: usize,
    /// Percentage of images carrying a non-empty `alt`, 2 dp.
    #[serde(rename = "Alt_Tag_Percent")]
    pub alt_tag_percent: f64,
}

impl SeoMetrics {
    /// Feature vector in [`FEATURE_NAMES`] order.
    pub fn features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.word_count as f64,
            self.keyword_density,
            self.meta_title_length as f64,
            self.meta_desc_length as f64,
            self.alt_tag_percent,
        ]
    }
}

/// Metrics and keywords derived from a single page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageAnalysis {
    pub metrics: SeoMetrics,
    /// Top page keywords, most frequent first.
    pub keywords: Vec<String>,
}

/// Derives SEO metrics and keywords from raw HTML.
///
/// With a non-blank `keyword` the density is measured for that keyword;
/// otherwise the page's most frequent keyword is used.
pub fn analyze_html(html: &str, keyword: Option<&str>) -> PageAnalysis {
    let doc = Document::parse(html);
    let text = doc.text_content();

    let words = word_count(&text);
    let keywords = extract_keywords(&text, DEFAULT_MAX_KEYWORDS);

    let focus = keyword
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .or_else(|| keywords.first().map(String::as_str));

    let keyword_density = match focus {
        Some(term) if words > 0 => round2(count_occurrences(&text, term) as f64 / words as f64 * 100.0),
        _ => 0.0,
    };

    let metrics = SeoMetrics {
        word_count: words,
        keyword_density,
        meta_title_length: doc.title().map(|t| t.chars().count()).unwrap_or(0),
        meta_desc_length: doc.meta_description().map(|d| d.chars().count()).unwrap_or(0),
        alt_tag_percent: round2(alt_tag_percent(&doc)),
    };

    PageAnalysis { metrics, keywords }
}

/// Share of `<img>` elements with a non-empty `alt`, 0 for pages without images.
fn alt_tag_percent(doc: &Document) -> f64 {
    let images = doc.images();
    if images.is_empty() {
        return 0.0;
    }

    let with_alt = images
        .iter()
        .filter(|img| img.attr("alt").is_some_and(|alt| !alt.is_empty()))
        .count();

    with_alt as f64 / images.len() as f64 * 100.0
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT_HTML: &str = r#"
        <html>
        <head>
            <title>Gold Ring Store</title>
            <meta name="description" content="Buy a gold ring today">
        </head>
        <body>
            <h1>Gold ring</h1>
            <p>Every gold ring ships free.</p>
            <img src="1.jpg" alt="ring">
            <img src="2.jpg" alt="">
            <img src="3.jpg">
        </body>
        </html>
    "#;

    #[test]
    fn test_metrics_with_keyword() {
        let analysis = analyze_html(PRODUCT_HTML, Some("gold ring"));
        let m = analysis.metrics;

        // "Gold Ring Store Gold ring Every gold ring ships free."
        assert_eq!(m.word_count, 10);
        assert_eq!(m.keyword_density, 30.0);
        assert_eq!(m.meta_title_length, 15);
        assert_eq!(m.meta_desc_length, 21);
        assert_eq!(m.alt_tag_percent, 33.33);
    }

    #[test]
    fn test_density_falls_back_to_top_keyword() {
        let analysis = analyze_html(PRODUCT_HTML, Some("   "));
        assert_eq!(analysis.keywords[0], "gold");
        assert_eq!(analysis.metrics.keyword_density, 30.0);
    }

    #[test]
    fn test_empty_page() {
        let analysis = analyze_html("", None);
        assert_eq!(analysis.metrics, SeoMetrics::default());
        assert!(analysis.keywords.is_empty());
    }

    #[test]
    fn test_page_without_images_scores_zero_alt() {
        let analysis = analyze_html("<p>plain page</p>", None);
        assert_eq!(analysis.metrics.alt_tag_percent, 0.0);
    }

    #[test]
    fn test_title_length_counts_characters() {
        let analysis = analyze_html("<title>Bijoux élégants</title>", None);
        assert_eq!(analysis.metrics.meta_title_length, 15);
    }

    #[test]
    fn test_serializes_with_model_column_names() {
        let json = serde_json::to_value(SeoMetrics::default()).unwrap();
        for name in FEATURE_NAMES {
            assert!(json.get(name).is_some(), "missing {}", name);
        }
    }

    #[test]
    fn test_features_order() {
        let m = SeoMetrics {
            word_count: 1,
            keyword_density: 2.0,
            meta_title_length: 3,
            meta_desc_length: 4,
            alt_tag_percent: 5.0,
        };
        assert_eq!(m.features(), [1.0, 2.0, 3.0, 4.0, 5.0]);
    }
}
