use std::sync::Arc;

use crate::config::Config;
use crate::layout::TextMetrics;
use crate::sheet::grading::Grader;
use crate::sheet::{ArtifactStore, TemplateService};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub service: Arc<TemplateService>,
    pub store: ArtifactStore,
    /// External grading backend. `None` makes POST /grade answer 501.
    pub grader: Option<Arc<dyn Grader>>,
}

impl AppState {
    pub fn new(config: Config, metrics: TextMetrics) -> Self {
        let service = Arc::new(TemplateService::new(metrics, config.max_questions));
        let store = ArtifactStore::new(config.artifact_dir.clone());
        Self {
            config,
            service,
            store,
            grader: None,
        }
    }
}
