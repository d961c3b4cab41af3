pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::job_import::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Job import
        .route("/job-from-url", post(handlers::handle_job_from_url))
        .with_state(state)
}
