//! Library API integration tests
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use rstest::rstest;
use storescope_core::*;
use tempfile::TempDir;

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(get_fixture_path(name)).unwrap()
}

async fn pagespeed_handler(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    match (params.get("url"), params.get("key")) {
        (Some(_), Some(key)) if key == "test-key" => {
            (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], read_fixture("pagespeed.json"))
        }
        _ => (
            StatusCode::BAD_REQUEST,
            [(header::CONTENT_TYPE, "application/json")],
            r#"{"error":{"code":400,"message":"API key not valid"}}"#.to_string(),
        ),
    }
}

async fn search_handler(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    assert_eq!(params.get("engine").map(String::as_str), Some("google"));
    match params.get("q").map(String::as_str) {
        Some("engagement ring") => (StatusCode::OK, read_fixture("serpapi.json")),
        _ => (StatusCode::OK, r#"{"organic_results":[]}"#.to_string()),
    }
}

/// Serves the fixtures over HTTP on an ephemeral local port.
async fn spawn_fixture_server() -> SocketAddr {
    let app = Router::new()
        .route("/shop", get(|| async { ([(header::CONTENT_TYPE, "text/html")], read_fixture("product_page.html")) }))
        .route("/bare", get(|| async { ([(header::CONTENT_TYPE, "text/html")], read_fixture("bare_page.html")) }))
        .route("/feed.xml", get(|| async { read_fixture("trending.rss") }))
        .route("/broken-feed.xml", get(|| async { "<rss><channel><title>unterminated" }))
        .route("/gone", get(|| async { StatusCode::GONE }))
        .route("/pagespeed", get(pagespeed_handler))
        .route("/search.json", get(search_handler));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Storefront pages plus a trends feed that counts how often it is requested.
async fn spawn_counting_server() -> (SocketAddr, Arc<AtomicUsize>) {
    let feed_hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/shop", get(|| async { ([(header::CONTENT_TYPE, "text/html")], read_fixture("product_page.html")) }))
        .route("/bare", get(|| async { ([(header::CONTENT_TYPE, "text/html")], read_fixture("bare_page.html")) }))
        .route(
            "/feed.xml",
            get(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                read_fixture("trending.rss")
            }),
        )
        .with_state(Arc::clone(&feed_hits));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, feed_hits)
}

fn fixture_model() -> SeoModel {
    SeoModel::load(get_fixture_path("seo_model.txt")).expect("fixture model should load")
}

#[test]
fn test_product_page_metrics() {
    let analysis = analyze_html(&read_fixture("product_page.html"), None);
    let m = analysis.metrics;

    assert_eq!(m.word_count, 24);
    assert_eq!(m.meta_title_length, 12);
    assert_eq!(m.meta_desc_length, 43);
    assert_eq!(m.alt_tag_percent, 50.0);
    assert_eq!(m.keyword_density, 20.83);
    assert_eq!(&analysis.keywords[..3], &["rings", "gold", "aurora"]);
    assert_eq!(analysis.keywords.len(), 10);
}

#[rstest]
#[case(Some("gold"), 8.33)]
#[case(Some("engagement rings"), 4.17)]
#[case(Some("   "), 20.83)]
#[case(Some("platinum"), 0.0)]
#[case(None, 20.83)]
fn test_keyword_density_focus(#[case] keyword: Option<&str>, #[case] expected: f64) {
    let analysis = analyze_html(&read_fixture("product_page.html"), keyword);
    assert_eq!(analysis.metrics.keyword_density, expected);
}

#[test]
fn test_bare_page_has_no_meta() {
    let m = analyze_html(&read_fixture("bare_page.html"), None).metrics;
    assert_eq!(m.word_count, 3);
    assert_eq!(m.meta_title_length, 0);
    assert_eq!(m.meta_desc_length, 0);
    assert_eq!(m.alt_tag_percent, 0.0);
}

#[test]
fn test_fixture_model_predictions() {
    let model = fixture_model();

    let short = SeoMetrics { word_count: 24, alt_tag_percent: 50.0, ..Default::default() };
    let long_without_alt = SeoMetrics { word_count: 900, alt_tag_percent: 20.0, ..Default::default() };
    let long_with_alt = SeoMetrics { word_count: 900, alt_tag_percent: 90.0, ..Default::default() };

    assert_eq!(model.predict(&short).unwrap(), 32.5);
    assert_eq!(model.predict(&long_without_alt).unwrap(), 57.5);
    assert_eq!(model.predict(&long_with_alt).unwrap(), 82.5);
}

#[test]
fn test_model_errors() {
    let dir = TempDir::new().unwrap();

    let missing = dir.path().join("nope.txt");
    assert!(matches!(SeoModel::load(&missing), Err(ScopeError::ModelNotFound(_))));

    let garbage = dir.path().join("garbage.txt");
    std::fs::write(&garbage, "not a model").unwrap();
    assert!(matches!(SeoModel::load(&garbage), Err(ScopeError::ModelFormat(_))));
}

#[test]
fn test_feed_fixture_keywords() {
    let keywords = trends::trending_keywords_from_feed(&read_fixture("trending.rss")).unwrap();
    assert_eq!(
        keywords,
        vec!["gold", "trending", "prices", "climb", "record", "high", "demand", "surges", "rings", "sell"]
    );
}

#[test]
fn test_api_fixture_parsing() {
    let links = search::organic_links(&read_fixture("serpapi.json")).unwrap();
    assert_eq!(links, vec!["https://aurora.example.com/rings", "https://deals.example.net/rings"]);

    let score = pagespeed::performance_score_from_json(&read_fixture("pagespeed.json")).unwrap();
    assert_eq!(score, 91.0);
}

#[test]
fn test_generate_train_save_load() {
    let dir = TempDir::new().unwrap();
    let data_path = dir.path().join("data/seo_data.csv");
    let model_path = dir.path().join("model/seo_model.txt");

    let samples = generate(600, 7);
    write_csv(&data_path, &samples).unwrap();
    let reloaded = read_csv(&data_path).unwrap();
    assert_eq!(reloaded.len(), 600);

    let config = TrainConfig { n_estimators: 20, ..Default::default() };
    let model = train(&reloaded, &config).unwrap();
    std::fs::create_dir_all(model_path.parent().unwrap()).unwrap();
    model.save(&model_path).unwrap();

    let seo_model = SeoModel::load(&model_path).unwrap();
    let score = seo_model.predict(&reloaded[0].metrics()).unwrap();
    assert!(score.is_finite());
    assert!(rmse(seo_model.inner(), &reloaded).unwrap() < 15.0);
}

#[tokio::test]
async fn test_fetch_url_statuses() {
    let addr = spawn_fixture_server().await;
    let config = FetchConfig::default();

    let html = fetch_url(&format!("http://{}/shop", addr), &config).await.unwrap();
    assert!(html.contains("Aurora Rings"));

    match fetch_url(&format!("http://{}/gone", addr), &config).await {
        Err(ScopeError::HttpStatus { status, .. }) => assert_eq!(status, 410),
        other => panic!("expected HttpStatus, got {:?}", other),
    }

    assert!(matches!(
        fetch_url("mailto:someone@example.com", &config).await,
        Err(ScopeError::InvalidUrl(_))
    ));
}

#[tokio::test]
async fn test_trends_client_against_feed() {
    let addr = spawn_fixture_server().await;

    let client = TrendsClient::new(format!("http://{}/feed.xml", addr), 5);
    let keywords = client.try_fetch().await.unwrap();
    assert_eq!(keywords[0], "gold");

    let broken = TrendsClient::new(format!("http://{}/broken-feed.xml", addr), 5);
    assert!(broken.fetch().await.is_empty());

    let gone = TrendsClient::new(format!("http://{}/gone", addr), 5);
    assert!(matches!(gone.try_fetch().await, Err(ScopeError::HttpStatus { status: 410, .. })));
}

#[tokio::test]
async fn test_pagespeed_client() {
    let addr = spawn_fixture_server().await;
    let endpoint = format!("http://{}/pagespeed", addr);

    let client = PageSpeedClient::new(Some("test-key".to_string())).with_endpoint(&endpoint);
    assert_eq!(client.score("https://aurora.example.com/").await, Some(91.0));

    let wrong_key = PageSpeedClient::new(Some("wrong".to_string())).with_endpoint(&endpoint);
    assert!(matches!(
        wrong_key.performance_score("https://aurora.example.com/").await,
        Err(ScopeError::Api { service: "pagespeed", .. })
    ));
    assert_eq!(wrong_key.score("https://aurora.example.com/").await, None);

    let no_key = PageSpeedClient::new(None).with_endpoint(&endpoint);
    assert_eq!(no_key.score("https://aurora.example.com/").await, None);
}

#[tokio::test]
async fn test_serpapi_client() {
    let addr = spawn_fixture_server().await;
    let endpoint = format!("http://{}/search.json", addr);

    let client = SerpApiClient::new(Some("serp".to_string())).with_endpoint(&endpoint);
    let links = client.search("engagement ring", 10).await.unwrap();
    assert_eq!(links.len(), 2);
    assert!(client.search("nothing", 10).await.unwrap().is_empty());

    let no_key = SerpApiClient::new(None).with_endpoint(&endpoint);
    assert!(matches!(
        no_key.search("engagement ring", 10).await,
        Err(ScopeError::MissingApiKey { service: "serpapi" })
    ));
}

#[tokio::test]
async fn test_analyze_website_end_to_end() {
    let addr = spawn_fixture_server().await;

    let analyzer = SeoAnalyzer::builder()
        .trends(TrendsClient::new(format!("http://{}/feed.xml", addr), 5))
        .pagespeed(PageSpeedClient::new(Some("test-key".to_string())).with_endpoint(format!("http://{}/pagespeed", addr)))
        .model(fixture_model())
        .build();

    let url = format!("http://{}/shop", addr);
    let report = analyzer.analyze_website(&url, None).await.unwrap();

    assert_eq!(report.url, url);
    assert_eq!(report.seo_score, Some(32.5));
    assert_eq!(report.pagespeed, Some(91.0));
    assert_eq!(report.metrics.word_count, 24);
    assert_eq!(report.overlap, vec!["rings", "gold"]);
    assert_eq!(report.global_trends[0], "gold");
}

#[tokio::test]
async fn test_rank_urls_skips_failures_and_sorts() {
    let addr = spawn_fixture_server().await;
    let analyzer = SeoAnalyzer::builder().model(fixture_model()).build();

    let urls = vec![
        format!("http://{}/bare", addr),
        format!("http://{}/gone", addr),
        format!("http://{}/shop", addr),
    ];
    let reports = analyzer.rank_urls(&urls, Some("rings")).await;

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.seo_score == Some(32.5)));
    assert_eq!(reports[0].url, urls[0], "equal scores keep input order");
    assert_eq!(reports[1].metrics.keyword_density, 20.83);
    assert!(reports.iter().all(|r| r.pagespeed.is_none() && r.global_trends.is_empty()));
}

#[tokio::test]
async fn test_find_products_with_serpapi_and_fake_classifier() {
    struct PrefersRings;

    impl ImageClassifier for PrefersRings {
        fn label_probabilities(&self, _image: &[u8], labels: &[String]) -> Result<Vec<f32>> {
            let logits: Vec<f32> =
                labels.iter().map(|l| if l == "engagement ring" { 5.0 } else { 0.0 }).collect();
            Ok(vision::softmax(&logits))
        }
    }

    let addr = spawn_fixture_server().await;
    let search = SerpApiClient::new(Some("serp".to_string())).with_endpoint(format!("http://{}/search.json", addr));
    let options = ProductOptions { top_k: 1, rank: false, ..Default::default() };

    let report = find_products(&PrefersRings, &search, &SeoAnalyzer::default(), b"jpeg", &options).await.unwrap();

    assert_eq!(report.labels, vec!["engagement ring"]);
    assert_eq!(report.urls, vec!["https://aurora.example.com/rings", "https://deals.example.net/rings"]);
    assert!(report.ranked.is_none());
}

#[tokio::test]
async fn test_find_products_ranks_storefronts() {
    struct PrefersGold;

    impl ImageClassifier for PrefersGold {
        fn label_probabilities(&self, _image: &[u8], labels: &[String]) -> Result<Vec<f32>> {
            let logits: Vec<f32> = labels.iter().map(|l| if l == "gold" { 3.0 } else { 1.0 }).collect();
            Ok(vision::softmax(&logits))
        }
    }

    struct StaticSearch(Vec<String>);

    #[async_trait::async_trait]
    impl WebSearch for StaticSearch {
        async fn search(&self, _query: &str, count: usize) -> Result<Vec<String>> {
            Ok(self.0.iter().take(count).cloned().collect())
        }
    }

    // Pages with a title score 90, pages without one score 10.
    let tree = model::Tree {
        split_feature: vec![2],
        threshold: vec![5.0],
        decision_type: vec![2],
        left_child: vec![-1],
        right_child: vec![-2],
        leaf_value: vec![10.0, 90.0],
        shrinkage: 1.0,
    };
    let names = metrics::FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
    let model = SeoModel::new(GbdtModel::new(names, vec![tree])).unwrap();

    let (addr, feed_hits) = spawn_counting_server().await;
    let analyzer = SeoAnalyzer::builder()
        .trends(TrendsClient::new(format!("http://{}/feed.xml", addr), 5))
        .model(model)
        .build();
    let search = StaticSearch(vec![format!("http://{}/bare", addr), format!("http://{}/shop", addr)]);
    let options = ProductOptions {
        top_k: 1,
        rank: true,
        labels: vec!["necklace".to_string(), "gold".to_string()],
        ..Default::default()
    };

    let report = find_products(&PrefersGold, &search, &analyzer, b"jpeg", &options).await.unwrap();

    assert_eq!(report.labels, vec!["gold"]);
    let ranked = report.ranked.expect("ranking was requested");
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].url, format!("http://{}/shop", addr));
    assert_eq!(ranked[0].seo_score, Some(90.0));
    assert_eq!(ranked[1].seo_score, Some(10.0));
    assert_eq!(ranked[0].metrics.keyword_density, 8.33, "density measured for the first label");
    assert_eq!(ranked[0].overlap, vec!["rings", "gold"]);
    assert!(ranked.iter().all(|r| !r.global_trends.is_empty()));
    assert_eq!(feed_hits.load(Ordering::SeqCst), 1, "trends fetched once per ranking");
}

#[test]
fn test_report_formatters() {
    let analyzer = SeoAnalyzer::builder().model(fixture_model()).build();
    let report = analyzer.build_report("https://aurora.example.com", &read_fixture("product_page.html"), None, &[], None);

    let text = TextFormatter::new(TextConfig::default()).report(&report);
    assert!(text.contains("32.50"));
    assert!(text.contains("rings, gold, aurora"));

    let json = JsonFormatter::new(JsonConfig::default()).ranking(std::slice::from_ref(&report)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["count"], 1);
    assert_eq!(value["results"][0]["meta"]["Alt_Tag_Percent"], 50.0);
}
