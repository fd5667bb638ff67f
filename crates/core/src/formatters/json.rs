use serde::Serialize;

use crate::Result;
use crate::products::ProductReport;
use crate::ranker::WebsiteReport;

/// Envelope for ranked results
#[derive(Debug, Clone, Serialize)]
pub struct RankingOutput<'a> {
    /// Number of URLs that were analyzed successfully
    pub count: usize,
    /// Reports, best SEO score first
    pub results: &'a [WebsiteReport],
}

/// Configuration for JSON output
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    /// Pretty print JSON output
    pub pretty: bool,
}

/// Serializes any value with the configured layout.
pub fn to_json<T: Serialize + ?Sized>(value: &T, config: &JsonConfig) -> Result<String> {
    if config.pretty { Ok(serde_json::to_string_pretty(value)?) } else { Ok(serde_json::to_string(value)?) }
}

pub fn report_to_json(report: &WebsiteReport, config: &JsonConfig) -> Result<String> {
    to_json(report, config)
}

pub fn ranking_to_json(reports: &[WebsiteReport], config: &JsonConfig) -> Result<String> {
    to_json(&RankingOutput { count: reports.len(), results: reports }, config)
}

pub fn products_to_json(report: &ProductReport, config: &JsonConfig) -> Result<String> {
    to_json(report, config)
}

/// JSON formatter with configurable options
pub struct JsonFormatter {
    config: JsonConfig,
}

impl JsonFormatter {
    pub fn new(config: JsonConfig) -> Self {
        Self { config }
    }

    pub fn report(&self, report: &WebsiteReport) -> Result<String> {
        report_to_json(report, &self.config)
    }

    pub fn ranking(&self, reports: &[WebsiteReport]) -> Result<String> {
        ranking_to_json(reports, &self.config)
    }

    pub fn products(&self, report: &ProductReport) -> Result<String> {
        products_to_json(report, &self.config)
    }
}
