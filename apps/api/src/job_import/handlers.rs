//! Axum route handlers for job import.

use std::time::Duration;

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::Deserialize;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::job_import::JobPostingRecord;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JobFromUrlRequest {
    #[serde(default)]
    pub url: String,
}

/// POST /job-from-url
///
/// Imports a job posting from a public URL and returns
/// `{ jobTitle, companyName, jobDescription }`. The whole import, browser
/// render included, must finish within `request_timeout_secs`.
pub async fn handle_job_from_url(
    State(state): State<AppState>,
    request: Result<Json<JobFromUrlRequest>, JsonRejection>,
) -> Result<Json<JobPostingRecord>, AppError> {
    let Json(request) = request.map_err(|e| {
        AppError::Validation(format!("Request body must be {{\"url\": string}}: {}", e.body_text()))
    })?;

    let request_id = Uuid::new_v4();
    let budget = Duration::from_secs(state.config.request_timeout_secs);
    let record = tokio::time::timeout(budget, state.job_extractor.extract(&request.url))
        .instrument(info_span!("job_from_url", %request_id))
        .await
        .map_err(|_| AppError::Timeout(budget))??;

    Ok(Json(record))
}
