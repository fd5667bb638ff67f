//! HTML parsing and DOM access.
//!
//! This module provides the [`Document`] and [`Element`] types used by the
//! metrics extractor to read titles, meta tags, images and visible text.
//!
//! # Example
//!
//! ```rust
//! use storescope_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <head><title>Shop</title></head>
//!         <body><img src="a.png" alt="A ring"></body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html);
//! assert_eq!(doc.title(), Some("Shop".to_string()));
//! assert_eq!(doc.images().len(), 1);
//! ```

use scraper::{ElementRef, Html, Node, Selector};

use crate::{Result, ScopeError};

/// Elements whose text is never rendered.
const HIDDEN_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Represents a parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses HTML from a string.
    ///
    /// html5ever recovers from any malformed markup, so parsing never fails.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`ScopeError::HtmlParseError`] if the selector is invalid.
    ///
    /// # Example
    ///
    /// ```rust
    /// use storescope_core::parse::Document;
    ///
    /// let doc = Document::parse(r#"<p class="price">10</p><p class="price">12</p>"#);
    /// assert_eq!(doc.select("p.price").unwrap().len(), 2);
    /// ```
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel =
            Selector::parse(selector).map_err(|e| ScopeError::HtmlParseError(format!("Invalid selector: {}", e)))?;

        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Gets the title of the document.
    ///
    /// Returns the text of the first `<title>` element if present.
    pub fn title(&self) -> Option<String> {
        self.select("title")
            .ok()?
            .first()
            .map(|el| el.text())
    }

    /// Gets the `content` of the first `<meta name="description">`.
    ///
    /// The `name` attribute is compared case-insensitively. A description tag
    /// without `content` yields an empty string.
    pub fn meta_description(&self) -> Option<String> {
        self.select("meta[name]")
            .ok()?
            .into_iter()
            .find(|el| el.attr("name").is_some_and(|name| name.eq_ignore_ascii_case("description")))
            .map(|el| el.attr("content").unwrap_or_default().to_string())
    }

    /// All `<img>` elements in document order.
    pub fn images(&self) -> Vec<Element<'_>> {
        self.select("img").unwrap_or_default()
    }

    /// Gets the visible text of the document.
    ///
    /// Text nodes are trimmed and joined with a single space. Text inside
    /// `script`, `style`, `noscript` and `template` is skipped.
    pub fn text_content(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();

        for node in self.html.tree.root().descendants() {
            let Node::Text(text) = node.value() else {
                continue;
            };

            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| HIDDEN_TEXT_ELEMENTS.contains(&el.name()))
            });
            if hidden {
                continue;
            }

            let trimmed = text.trim();
            if !trimmed.is_empty() {
                parts.push(trimmed);
            }
        }

        parts.join(" ")
    }
}

/// A wrapper around scraper's ElementRef.
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Gets the text content of this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.element.value().attr(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <title>Gold Rings | Example Jewels</title>
            <meta name="Description" content="Handmade gold rings.">
            <style>.hidden { display: none }</style>
            <script>var tracking = "ignored words";</script>
        </head>
        <body>
            <h1>Gold rings</h1>
            <p>Browse our <b>rings</b> collection.</p>
            <img src="a.jpg" alt="Gold ring">
            <img src="b.jpg">
        </body>
        </html>
    "#;

    #[test]
    fn test_title() {
        let doc = Document::parse(SAMPLE_HTML);
        assert_eq!(doc.title(), Some("Gold Rings | Example Jewels".to_string()));
    }

    #[test]
    fn test_missing_title() {
        let doc = Document::parse("<html><body><p>no head</p></body></html>");
        assert_eq!(doc.title(), None);
    }

    #[test]
    fn test_meta_description_case_insensitive_name() {
        let doc = Document::parse(SAMPLE_HTML);
        assert_eq!(doc.meta_description(), Some("Handmade gold rings.".to_string()));
    }

    #[test]
    fn test_meta_description_without_content() {
        let doc = Document::parse(r#"<html><head><meta name="description"></head></html>"#);
        assert_eq!(doc.meta_description(), Some(String::new()));
    }

    #[test]
    fn test_images() {
        let doc = Document::parse(SAMPLE_HTML);
        let images = doc.images();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].attr("alt"), Some("Gold ring"));
        assert_eq!(images[1].attr("alt"), None);
    }

    #[test]
    fn test_text_content_skips_scripts_and_styles() {
        let doc = Document::parse(SAMPLE_HTML);
        let text = doc.text_content();

        assert!(text.contains("Gold rings"));
        assert!(text.contains("Browse our rings collection."));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("display"));
    }

    #[test]
    fn test_invalid_selector() {
        let doc = Document::parse(SAMPLE_HTML);
        assert!(matches!(doc.select("[[invalid"), Err(ScopeError::HtmlParseError(_))));
    }
}
