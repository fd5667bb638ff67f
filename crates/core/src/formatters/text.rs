use std::fmt::Write;

use crate::products::ProductReport;
use crate::ranker::WebsiteReport;

const LABEL_WIDTH: usize = 20;

/// Configuration for plain text reports
#[derive(Debug, Clone)]
pub struct TextConfig {
    /// Wrap keyword lists at this width (0 = no wrapping)
    pub line_width: usize,

    /// Include the keyword, trend and overlap lists
    pub include_keywords: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self { line_width: 80, include_keywords: true }
    }
}

/// Plain text formatter for analysis results
pub struct TextFormatter {
    config: TextConfig,
}

impl TextFormatter {
    pub fn new(config: TextConfig) -> Self {
        Self { config }
    }

    pub fn report(&self, report: &WebsiteReport) -> String {
        report_to_text(report, &self.config)
    }

    pub fn ranking(&self, reports: &[WebsiteReport]) -> String {
        ranking_to_text(reports, &self.config)
    }

    pub fn products(&self, report: &ProductReport) -> String {
        products_to_text(report, &self.config)
    }
}

/// Renders one website report.
pub fn report_to_text(report: &WebsiteReport, config: &TextConfig) -> String {
    let mut out = String::new();
    let m = &report.metrics;

    out.push_str(&report.url);
    out.push('\n');
    out.push_str(&"=".repeat(report.url.chars().count()));
    out.push('\n');

    field(&mut out, "SEO score", &optional_score(report.seo_score));
    field(&mut out, "PageSpeed", &optional_score(report.pagespeed));
    field(&mut out, "Words", &m.word_count.to_string());
    field(&mut out, "Keyword density", &format!("{:.2}%", m.keyword_density));
    field(&mut out, "Title length", &m.meta_title_length.to_string());
    field(&mut out, "Description length", &m.meta_desc_length.to_string());
    field(&mut out, "Images with alt", &format!("{:.2}%", m.alt_tag_percent));

    if config.include_keywords {
        list_field(&mut out, "Keywords", &report.keywords, config.line_width);
        list_field(&mut out, "Trending", &report.global_trends, config.line_width);
        list_field(&mut out, "Overlap", &report.overlap, config.line_width);
    }

    out.trim_end().to_string()
}

/// Renders a ranked list, best first, one line per URL.
pub fn ranking_to_text(reports: &[WebsiteReport], config: &TextConfig) -> String {
    if reports.is_empty() {
        return "No websites could be analyzed.".to_string();
    }

    let mut out = String::new();
    for (i, report) in reports.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>2}. {:>6}  {}  (PageSpeed {})",
            i + 1,
            optional_score(report.seo_score),
            report.url,
            optional_score(report.pagespeed)
        );

        if config.include_keywords && !report.overlap.is_empty() {
            let _ = writeln!(out, "      trending: {}", report.overlap.join(", "));
        }
    }

    out.trim_end().to_string()
}

/// Renders the image-to-storefront result.
pub fn products_to_text(report: &ProductReport, config: &TextConfig) -> String {
    let mut out = String::new();

    list_field(&mut out, "Detected", &report.labels, config.line_width);

    if report.urls.is_empty() {
        out.push_str("No storefront URLs found.\n");
    } else {
        let _ = writeln!(out, "\nStorefronts ({}):", report.urls.len());
        for url in &report.urls {
            let _ = writeln!(out, "  {}", url);
        }
    }

    if let Some(ranked) = &report.ranked
        && !report.urls.is_empty()
    {
        out.push_str("\nRanked by SEO score:\n");
        out.push_str(&ranking_to_text(ranked, config));
    }

    out.trim_end().to_string()
}

fn optional_score(score: Option<f64>) -> String {
    match score {
        Some(value) => format!("{:.2}", value),
        None => "n/a".to_string(),
    }
}

fn field(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "{:<width$} {}", format!("{}:", label), value, width = LABEL_WIDTH);
}

fn list_field(out: &mut String, label: &str, items: &[String], width: usize) {
    let value = if items.is_empty() { "(none)".to_string() } else { items.join(", ") };
    let indent = LABEL_WIDTH + 1;
    let wrapped = if width > indent { wrap_text(&value, width - indent) } else { value };

    let mut lines = wrapped.lines();
    field(out, label, lines.next().unwrap_or_default());
    for line in lines {
        let _ = writeln!(out, "{}{}", " ".repeat(indent), line);
    }
}

/// Wrap text to specified line width
fn wrap_text(text: &str, width: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if width == 0 || words.is_empty() {
        return text.to_string();
    }

    let mut lines = Vec::new();
    let mut current_line = Vec::new();
    let mut current_length = 0;

    for word in words {
        let word_len = word.chars().count();

        if current_length == 0 {
            current_line.push(word);
            current_length = word_len;
        } else if current_length + 1 + word_len <= width {
            current_length += 1 + word_len;
            current_line.push(word);
        } else {
            lines.push(current_line.join(" "));
            current_line = vec![word];
            current_length = word_len;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line.join(" "));
    }

    lines.join("\n")
}
