//! Fetcher: retrieves raw HTML for a job URL.
//!
//! `FetchStrategy` makes at most two attempts per request:
//! 1. a direct HTTP GET (`DirectSource`);
//! 2. a headless-browser render (`BrowserSource`) when the direct response
//!    looks client-rendered or the direct request never got a response.
//!
//! Browser sessions are scoped to a single `BrowserSource::fetch` call and
//! closed on every path.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::Page;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA};
use reqwest::{redirect, Client};
use scraper::Html;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::job_import::html::visible_text;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Below this many visible characters a page is assumed to be client-rendered.
pub const MIN_VISIBLE_TEXT_CHARS: usize = 500;

const CLIENT_RENDER_MARKERS: &[&str] = &[
    "enable javascript",
    "javascript is required",
    "javascript is disabled",
    "requires javascript",
    "loading...",
    "loading…",
];

const DIRECT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 10;
/// Bound for each browser wait strategy.
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
/// Time given to client-side scripts to populate the page after navigation.
pub const SETTLE_DELAY: Duration = Duration::from_secs(5);
const READY_STATE_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded with HTTP {0}")]
    Status(u16),

    #[error("browser rendering failed: {0}")]
    Browser(String),

    #[error("navigation timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("page returned an empty document")]
    EmptyDocument,

    #[error("{direct}; rendering the page also failed: {rendered}")]
    Exhausted {
        direct: Box<FetchError>,
        rendered: Box<FetchError>,
    },
}

impl FetchError {
    /// A response with a definitive status ends the fetch; anything that
    /// never produced a response may still succeed in a real browser.
    fn warrants_render(&self) -> bool {
        !matches!(self, FetchError::Status(_))
    }
}

fn browser_err(e: impl fmt::Display) -> FetchError {
    FetchError::Browser(e.to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// Documents
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMethod {
    DirectFetch,
    Rendered,
}

impl fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrievalMethod::DirectFetch => f.write_str("direct-fetch"),
            RetrievalMethod::Rendered => f.write_str("rendered"),
        }
    }
}

/// HTML of a fetched page and how it was obtained. Never empty.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub html: String,
    pub method: RetrievalMethod,
}

impl RawDocument {
    pub fn new(html: String, method: RetrievalMethod) -> Result<Self, FetchError> {
        if html.trim().is_empty() {
            return Err(FetchError::EmptyDocument);
        }
        Ok(Self { html, method })
    }
}

/// True when the HTML carries too little visible text to be the finished
/// page, or shows a loading / "enable JavaScript" placeholder.
pub fn looks_client_rendered(html: &str) -> bool {
    let text = visible_text(&Html::parse_document(html));
    if text.chars().count() < MIN_VISIBLE_TEXT_CHARS {
        return true;
    }
    let lower = text.to_lowercase();
    CLIENT_RENDER_MARKERS.iter().any(|m| lower.contains(m))
}

// ────────────────────────────────────────────────────────────────────────────
// Traits
// ────────────────────────────────────────────────────────────────────────────

/// One way of turning a URL into HTML.
#[async_trait]
pub trait PageSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// Produces the `RawDocument` for a request. Implemented by `FetchStrategy`;
/// the pipeline depends only on this trait.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch_document(&self, url: &Url) -> Result<RawDocument, FetchError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Direct HTTP
// ────────────────────────────────────────────────────────────────────────────

/// Plain HTTP GET with a desktop browser User-Agent. Redirects are
/// followed and caches are bypassed.
pub struct DirectSource {
    client: Client,
}

impl DirectSource {
    pub fn new() -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(DIRECT_TIMEOUT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for DirectSource {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Headless browser
// ────────────────────────────────────────────────────────────────────────────

/// Starts an isolated browser for a single render.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, FetchError>;
}

/// A running browser instance owned by one request.
#[async_trait]
pub trait BrowserSession: Send {
    async fn render(&mut self, url: &Url) -> Result<String, FetchError>;

    /// Shuts the browser down. Consumes the session so it cannot be reused.
    async fn close(self: Box<Self>);
}

/// Renders pages in a freshly launched browser.
pub struct BrowserSource {
    launcher: Arc<dyn BrowserLauncher>,
}

impl BrowserSource {
    pub fn new(launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self { launcher }
    }
}

#[async_trait]
impl PageSource for BrowserSource {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let mut session = self.launcher.launch().await?;
        let rendered = session.render(url).await;
        session.close().await;
        rendered
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitUntil {
    DomContentLoaded,
    Load,
}

impl WaitUntil {
    fn is_satisfied_by(self, ready_state: &str) -> bool {
        match self {
            WaitUntil::DomContentLoaded => ready_state == "interactive" || ready_state == "complete",
            WaitUntil::Load => ready_state == "complete",
        }
    }
}

/// Launches headless Chromium through the DevTools protocol.
pub struct ChromiumLauncher {
    chrome_executable: Option<PathBuf>,
}

impl ChromiumLauncher {
    pub fn new(chrome_executable: Option<PathBuf>) -> Self {
        Self { chrome_executable }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, FetchError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .request_timeout(NAVIGATION_TIMEOUT)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--no-first-run")
            .arg(format!("--user-agent={USER_AGENT}"));
        if let Some(path) = &self.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(FetchError::Browser)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(browser_err)?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        debug!("Headless browser launched");

        Ok(Box::new(ChromiumSession {
            browser: Some(browser),
            handler_task,
        }))
    }
}

struct ChromiumSession {
    browser: Option<Browser>,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn render(&mut self, url: &Url) -> Result<String, FetchError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| FetchError::Browser("session already closed".to_string()))?;
        let page = browser.new_page("about:blank").await.map_err(browser_err)?;

        if let Err(e) = navigate(&page, url, WaitUntil::DomContentLoaded).await {
            warn!("DOMContentLoaded wait failed for {url} ({e}), retrying with full load wait");
            navigate(&page, url, WaitUntil::Load).await?;
        }

        tokio::time::sleep(SETTLE_DELAY).await;

        let html = page.content().await.map_err(browser_err)?;
        if let Err(e) = page.close().await {
            debug!("Failed to close page: {e}");
        }
        Ok(html)
    }

    async fn close(mut self: Box<Self>) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser: {e}");
            }
            if let Err(e) = browser.wait().await {
                warn!("Failed to reap browser process: {e}");
            }
        }
        self.handler_task.abort();
        debug!("Headless browser closed");
    }
}

impl Drop for ChromiumSession {
    // Reached without `close` only on panic or cancellation. Dropping the
    // `Browser` kills its child process.
    fn drop(&mut self) {
        if self.browser.is_some() {
            warn!("Browser session dropped without close; killing browser");
        }
        self.handler_task.abort();
    }
}

async fn navigate(page: &Page, url: &Url, wait: WaitUntil) -> Result<(), FetchError> {
    let attempt = async {
        let navigation = page
            .execute(NavigateParams::new(url.as_str()))
            .await
            .map_err(browser_err)?;
        if let Some(error_text) = &navigation.result.error_text {
            return Err(FetchError::Browser(format!("navigation failed: {error_text}")));
        }
        wait_for_ready_state(page, wait).await
    };

    tokio::time::timeout(NAVIGATION_TIMEOUT, attempt)
        .await
        .map_err(|_| FetchError::Timeout(NAVIGATION_TIMEOUT))?
}

async fn wait_for_ready_state(page: &Page, wait: WaitUntil) -> Result<(), FetchError> {
    // about:blank is already "complete"; wait for the target document instead.
    const READY_STATE_JS: &str =
        "document.location.href === 'about:blank' ? 'loading' : document.readyState";
    loop {
        let state: String = page
            .evaluate(READY_STATE_JS)
            .await
            .map_err(browser_err)?
            .into_value()
            .map_err(browser_err)?;
        if wait.is_satisfied_by(&state) {
            return Ok(());
        }
        tokio::time::sleep(READY_STATE_POLL).await;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Strategy
// ────────────────────────────────────────────────────────────────────────────

/// Direct fetch first, browser render second.
pub struct FetchStrategy {
    direct: Arc<dyn PageSource>,
    rendered: Option<Arc<dyn PageSource>>,
}

impl FetchStrategy {
    pub fn new(direct: Arc<dyn PageSource>, rendered: Option<Arc<dyn PageSource>>) -> Self {
        Self { direct, rendered }
    }
}

#[async_trait]
impl DocumentFetcher for FetchStrategy {
    async fn fetch_document(&self, url: &Url) -> Result<RawDocument, FetchError> {
        match self.direct.fetch(url).await {
            Ok(html) => {
                if !looks_client_rendered(&html) {
                    return RawDocument::new(html, RetrievalMethod::DirectFetch);
                }
                let Some(renderer) = &self.rendered else {
                    debug!("{url} looks client-rendered but rendering is disabled");
                    return RawDocument::new(html, RetrievalMethod::DirectFetch);
                };

                info!("{url} looks client-rendered, rendering with {}", renderer.name());
                match renderer.fetch(url).await {
                    Ok(rendered) if !rendered.trim().is_empty() => {
                        RawDocument::new(rendered, RetrievalMethod::Rendered)
                    }
                    Ok(_) => {
                        warn!("Rendered document for {url} was empty, keeping direct response");
                        RawDocument::new(html, RetrievalMethod::DirectFetch)
                    }
                    Err(e) => {
                        warn!("Rendering {url} failed ({e}), keeping direct response");
                        RawDocument::new(html, RetrievalMethod::DirectFetch)
                    }
                }
            }
            Err(direct) => {
                let renderer = match &self.rendered {
                    Some(renderer) if direct.warrants_render() => renderer,
                    _ => return Err(direct),
                };

                warn!("Direct fetch of {url} failed ({direct}), rendering with {}", renderer.name());
                match renderer.fetch(url).await {
                    Ok(rendered) => RawDocument::new(rendered, RetrievalMethod::Rendered),
                    Err(rendered) => Err(FetchError::Exhausted {
                        direct: Box::new(direct),
                        rendered: Box::new(rendered),
                    }),
                }
            }
        }
    }
}
