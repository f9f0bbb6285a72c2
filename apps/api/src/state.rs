use std::sync::Arc;

use crate::config::Config;
use crate::font_service::jobs::JobTracker;
use crate::font_service::FontBuildService;
use crate::fonts::FontRegistry;
use crate::layout::PreviewSessions;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Loaded handwriting fonts, keyed by id.
    pub fonts: Arc<FontRegistry>,
    /// Remote font builder. `None` when FONT_API_BASE is unset.
    pub font_service: Option<Arc<dyn FontBuildService>>,
    pub jobs: Arc<JobTracker>,
    pub previews: Arc<PreviewSessions>,
}

impl AppState {
    pub fn new(config: Config, font_service: Option<Arc<dyn FontBuildService>>) -> Self {
        Self {
            fonts: Arc::new(FontRegistry::new()),
            font_service,
            jobs: Arc::new(JobTracker::new(config.font_service.job_retention)),
            previews: Arc::new(PreviewSessions::new(config.preview_idle_ttl)),
            config,
        }
    }
}
