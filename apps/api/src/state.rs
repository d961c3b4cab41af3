use std::sync::Arc;

use crate::config::Config;
use crate::job_import::JobExtractor;

/// Shared application state injected into all route handlers via Axum extractors.
/// Holds no per-request data; every import runs independently.
#[derive(Clone)]
pub struct AppState {
    pub job_extractor: Arc<JobExtractor>,
    pub config: Config,
}
