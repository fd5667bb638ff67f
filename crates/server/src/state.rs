use std::sync::Arc;

use storescope_core::{ClipClassifier, ImageClassifier, SeoAnalyzer, Settings, WebSearch};
use tokio::sync::OnceCell;
use tracing::info;

use crate::error::ApiError;

/// Shared by every handler.
pub struct AppState {
    pub analyzer: SeoAnalyzer,
    pub search: Arc<dyn WebSearch>,
    pub search_enabled: bool,
    pub pagespeed_enabled: bool,
    classifier: OnceCell<Arc<dyn ImageClassifier>>,
}

impl AppState {
    pub fn new(analyzer: SeoAnalyzer, search: Arc<dyn WebSearch>, search_enabled: bool) -> Self {
        Self { analyzer, search, search_enabled, pagespeed_enabled: false, classifier: OnceCell::new() }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let search = settings.search_client();
        let search_enabled = search.has_api_key();
        let mut state = Self::new(settings.analyzer_builder().build(), Arc::new(search), search_enabled);
        state.pagespeed_enabled = settings.pagespeed_api_key.is_some();
        state
    }

    /// Uses `classifier` instead of downloading CLIP on first upload.
    pub fn with_classifier(self, classifier: Arc<dyn ImageClassifier>) -> Self {
        let _ = self.classifier.set(classifier);
        self
    }

    /// The image classifier, loading CLIP weights on first use.
    pub async fn classifier(&self) -> Result<Arc<dyn ImageClassifier>, ApiError> {
        let classifier = self
            .classifier
            .get_or_try_init(|| async {
                info!("loading CLIP weights");
                let clip = ClipClassifier::from_hub().await?;
                Ok::<_, ApiError>(Arc::new(clip) as Arc<dyn ImageClassifier>)
            })
            .await?;
        Ok(Arc::clone(classifier))
    }
}
