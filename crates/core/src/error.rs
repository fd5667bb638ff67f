//! Error types for Storescope operations.
//!
//! This module defines the main error type [`ScopeError`] which represents
//! all possible errors that can occur while fetching pages, calling the
//! third-party APIs, loading or training the SEO model, and classifying
//! product images.
//!
//! # Example
//!
//! ```rust
//! use storescope_core::{ScopeError, Result};
//!
//! fn require_key(key: Option<&str>) -> Result<&str> {
//!     key.ok_or(ScopeError::MissingApiKey { service: "serpapi" })
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the SEO and product-discovery pipeline.
#[derive(Error, Debug)]
pub enum ScopeError {
    /// HTTP request errors from reqwest.
    ///
    /// Wraps network errors, DNS failures, TLS problems and body decoding errors.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// The server answered with a non-success status code.
    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML parsing errors, usually an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// The trending-news RSS feed could not be read.
    #[error("Failed to parse feed: {0}")]
    FeedError(String),

    /// A third-party API answered but the payload was not usable.
    #[error("{service} API error: {message}")]
    Api { service: &'static str, message: String },

    /// An API key required by a third-party service is not configured.
    #[error("No API key configured for {service}")]
    MissingApiKey { service: &'static str },

    /// The regression model file does not exist.
    #[error("Model file not found at {0}")]
    ModelNotFound(PathBuf),

    /// The regression model file is malformed or incompatible.
    #[error("Invalid model: {0}")]
    ModelFormat(String),

    /// The uploaded image could not be decoded.
    #[error("Failed to decode image: {0}")]
    Image(String),

    /// Vision model loading or inference failed.
    #[error("Vision model error: {0}")]
    Vision(String),

    /// Training data could not be read or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON decoding errors.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "clip")]
impl From<candle_core::Error> for ScopeError {
    fn from(err: candle_core::Error) -> Self {
        ScopeError::Vision(err.to_string())
    }
}

#[cfg(feature = "clip")]
impl From<image::ImageError> for ScopeError {
    fn from(err: image::ImageError) -> Self {
        ScopeError::Image(err.to_string())
    }
}

/// Result type alias for ScopeError.
pub type Result<T> = std::result::Result<T, ScopeError>;
