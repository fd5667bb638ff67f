use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use serde::{Deserialize, Serialize};
use storescope_core::{ProductOptions, ProductReport, WebsiteReport, parse_http_url, products_for_labels, top_labels};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub model_loaded: bool,
    pub search_enabled: bool,
    pub pagespeed_enabled: bool,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        status: "ok",
        model_loaded: state.analyzer.has_model(),
        search_enabled: state.search_enabled,
        pagespeed_enabled: state.pagespeed_enabled,
    })
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub url: String,
    pub keyword: Option<String>,
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<WebsiteReport>, ApiError> {
    let Json(request) = payload?;
    let url = parse_http_url(&request.url)?;
    debug!(url = %url, "analyze request");
    let report = state.analyzer.analyze_website(url.as_str(), request.keyword.as_deref()).await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct RankRequest {
    pub urls: Vec<String>,
    pub keyword: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RankResponse {
    pub count: usize,
    pub results: Vec<WebsiteReport>,
    /// Requested URLs that could not be analyzed.
    pub skipped: Vec<String>,
}

pub async fn rank(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RankRequest>, JsonRejection>,
) -> Result<Json<RankResponse>, ApiError> {
    let Json(request) = payload?;
    if request.urls.is_empty() {
        return Err(ApiError::bad_request("urls must not be empty"));
    }

    info!(count = request.urls.len(), "rank request");
    let results = state.analyzer.rank_urls(&request.urls, request.keyword.as_deref()).await;
    let skipped = request
        .urls
        .into_iter()
        .filter(|url| !results.iter().any(|r| &r.url == url))
        .collect();

    Ok(Json(RankResponse { count: results.len(), results, skipped }))
}

/// Multipart fields: `image` (required), `top_k`, `max_urls`, `rank`, `labels`.
pub async fn products(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ProductReport>, ApiError> {
    if !state.search_enabled {
        return Err(ApiError::Unavailable("SERPAPI_KEY is not configured".to_string()));
    }

    let mut image = None;
    let mut options = ProductOptions::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => image = Some(field.bytes().await?.to_vec()),
            "top_k" => options.top_k = parse_field(&name, &field.text().await?)?,
            "max_urls" => options.max_urls = parse_field(&name, &field.text().await?)?,
            "rank" => options.rank = parse_field(&name, &field.text().await?)?,
            "labels" => {
                options.labels = field
                    .text()
                    .await?
                    .split(',')
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(String::from)
                    .collect();
            }
            other => debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    let image = match image {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return Err(ApiError::bad_request("missing image field")),
    };

    let classifier = state.classifier().await?;
    let top_k = options.top_k();
    let candidates = options.labels.clone();
    let labels = tokio::task::spawn_blocking(move || top_labels(classifier.as_ref(), &image, top_k, &candidates))
        .await
        .map_err(|e| ApiError::Internal(format!("classification task failed: {}", e)))??;
    info!(labels = ?labels, "detected product labels");

    let report = products_for_labels(state.search.as_ref(), &state.analyzer, labels, &options).await;
    Ok(Json(report))
}

fn parse_field<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ApiError> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("invalid value for {}: {}", name, value.trim())))
}
