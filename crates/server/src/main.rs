//! HTTP front end for storefront SEO analysis and image-driven product search.

mod error;
mod handlers;
mod routes;
mod state;

use std::env;
use std::sync::Arc;

use anyhow::Context;
use storescope_core::Settings;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

const ADDR_VAR: &str = "STORESCOPE_ADDR";
const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let settings = Settings::from_env();
    let state = AppState::from_settings(&settings);
    if !state.analyzer.has_model() {
        warn!(path = %settings.model_path.display(), "no SEO model loaded; scores will be null");
    }
    if !state.search_enabled {
        warn!("SERPAPI_KEY not set; /api/products is disabled");
    }

    let addr = env::var(ADDR_VAR).unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("Failed to bind {}", addr))?;
    info!("listening on http://{}", addr);

    axum::serve(listener, routes::app(Arc::new(state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
