use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::job_import::ExtractionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Job import exceeded its {}s budget", .0.as_secs())]
    Timeout(Duration),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, Some("INVALID_REQUEST"), msg.clone()),
            AppError::Extraction(e) if e.is_client_error() => {
                (StatusCode::BAD_REQUEST, Some(e.code()), e.to_string())
            }
            AppError::Extraction(e) => {
                tracing::error!("Extraction error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    "Failed to extract job details from this page. Please try again or paste the job description instead."
                        .to_string(),
                )
            }
            AppError::Timeout(budget) => {
                tracing::error!("{self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    format!(
                        "This page took longer than {} seconds to import. Please try again or paste the job description instead.",
                        budget.as_secs()
                    ),
                )
            }
        };

        let body = match code {
            Some(code) => json!({ "error": message, "code": code }),
            None => json!({ "error": message }),
        };

        (status, Json(body)).into_response()
    }
}
