//! Runtime settings read from the environment.

use std::env;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::fetch::FetchConfig;
use crate::model::{DEFAULT_MODEL_PATH, SeoModel};
use crate::pagespeed::PageSpeedClient;
use crate::ranker::SeoAnalyzerBuilder;
use crate::search::SerpApiClient;
use crate::trends::{DEFAULT_TRENDS_URL, TrendsClient};

pub const SERPAPI_KEY_VAR: &str = "SERPAPI_KEY";
pub const PAGESPEED_KEY_VAR: &str = "GOOGLE_PAGESPEED_API_KEY";
pub const MODEL_PATH_VAR: &str = "STORESCOPE_MODEL_PATH";
pub const TRENDS_URL_VAR: &str = "STORESCOPE_TRENDS_URL";
pub const HTTP_TIMEOUT_VAR: &str = "HTTP_TIMEOUT_SECS";

/// Keys, paths and timeouts shared by the CLI and the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub serpapi_key: Option<String>,
    pub pagespeed_api_key: Option<String>,
    pub model_path: PathBuf,
    pub trends_url: String,
    /// Page fetch timeout in seconds.
    pub http_timeout: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            serpapi_key: None,
            pagespeed_api_key: None,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            trends_url: DEFAULT_TRENDS_URL.to_string(),
            http_timeout: FetchConfig::default().timeout,
        }
    }
}

impl Settings {
    /// Reads settings from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads settings through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let http_timeout = match get(HTTP_TIMEOUT_VAR) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    warn!(value = %raw, "ignoring invalid {}", HTTP_TIMEOUT_VAR);
                    defaults.http_timeout
                }
            },
            None => defaults.http_timeout,
        };

        Self {
            serpapi_key: get(SERPAPI_KEY_VAR),
            pagespeed_api_key: get(PAGESPEED_KEY_VAR),
            model_path: get(MODEL_PATH_VAR).map(PathBuf::from).unwrap_or(defaults.model_path),
            trends_url: get(TRENDS_URL_VAR).unwrap_or(defaults.trends_url),
            http_timeout,
        }
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig { timeout: self.http_timeout, ..Default::default() }
    }

    pub fn trends_client(&self) -> TrendsClient {
        TrendsClient::new(self.trends_url.clone(), self.http_timeout)
    }

    pub fn pagespeed_client(&self) -> PageSpeedClient {
        PageSpeedClient::new(self.pagespeed_api_key.clone())
    }

    pub fn search_client(&self) -> SerpApiClient {
        SerpApiClient::new(self.serpapi_key.clone())
    }

    /// Loads the SEO model, logging and returning `None` when it is unusable.
    pub fn load_model(&self) -> Option<SeoModel> {
        match SeoModel::load(&self.model_path) {
            Ok(model) => {
                debug!(path = %self.model_path.display(), "loaded SEO model");
                Some(model)
            }
            Err(e) => {
                warn!(error = %e, "SEO scores disabled");
                None
            }
        }
    }

    /// Analyzer builder with every lookup enabled and the model loaded.
    pub fn analyzer_builder(&self) -> SeoAnalyzerBuilder {
        SeoAnalyzerBuilder::new()
            .fetch_config(self.fetch_config())
            .trends(self.trends_client())
            .pagespeed(self.pagespeed_client())
            .maybe_model(self.load_model())
    }
}
