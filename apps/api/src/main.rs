mod config;
mod errors;
mod job_import;
mod llm_client;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::job_import::fetcher::{
    BrowserSource, ChromiumLauncher, DirectSource, FetchStrategy, PageSource,
};
use crate::job_import::fields::LlmFieldExtractor;
use crate::job_import::heuristic::DensityExtractor;
use crate::job_import::JobExtractor;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Sage API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::from_config(&config)?;
    info!("LLM client initialized (deployment: {})", llm.deployment());

    // Initialize job import pipeline
    let job_extractor = build_job_extractor(&config, llm)?;

    let state = AppState {
        job_extractor: Arc::new(job_extractor),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the web app's domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Wires the production fetch strategy, heuristic, and LLM extractor.
fn build_job_extractor(config: &Config, llm: LlmClient) -> Result<JobExtractor> {
    let direct: Arc<dyn PageSource> = Arc::new(DirectSource::new()?);

    let rendered: Option<Arc<dyn PageSource>> = if config.browser_rendering {
        let launcher = ChromiumLauncher::new(config.chrome_executable.as_ref().map(PathBuf::from));
        info!("Browser rendering enabled for client-rendered pages");
        Some(Arc::new(BrowserSource::new(Arc::new(launcher))))
    } else {
        info!("Browser rendering disabled; using direct fetches only");
        None
    };

    Ok(JobExtractor::new(
        Arc::new(FetchStrategy::new(direct, rendered)),
        Arc::new(DensityExtractor),
        Arc::new(LlmFieldExtractor::new(llm)),
    ))
}
