//! Orchestrator for a single job import.
//!
//! Init → Validated → Fetched → (StructuredMatch | HeuristicExtracted)
//!      → Done | Rejected | Failed
//!
//! At most one fetch and at most one LLM call per request. A structured-data
//! hit ends the pipeline before heuristics or the LLM run.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use crate::job_import::error::ExtractionError;
use crate::job_import::fetcher::DocumentFetcher;
use crate::job_import::fields::FieldExtractor;
use crate::job_import::heuristic::ContentExtractor;
use crate::job_import::structured::extract_job_posting;
use crate::job_import::JobPostingRecord;

/// Pages with less extracted text than this are rejected before the LLM call.
pub const MIN_CONTENT_CHARS: usize = 200;

struct DisallowedDomain {
    domain: &'static str,
    code: &'static str,
}

/// Sites whose job pages sit behind a login this service cannot satisfy.
const DISALLOWED_DOMAINS: &[DisallowedDomain] = &[
    DisallowedDomain {
        domain: "linkedin.com",
        code: "LINKEDIN_NOT_SUPPORTED",
    },
    DisallowedDomain {
        domain: "lnkd.in",
        code: "LINKEDIN_NOT_SUPPORTED",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Validated,
    Fetched,
    StructuredMatch,
    HeuristicExtracted,
    Done,
    Rejected,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Init => "init",
            PipelineState::Validated => "validated",
            PipelineState::Fetched => "fetched",
            PipelineState::StructuredMatch => "structured_match",
            PipelineState::HeuristicExtracted => "heuristic_extracted",
            PipelineState::Done => "done",
            PipelineState::Rejected => "rejected",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl PipelineState {
    /// Terminal state reached by a failed import.
    fn for_error(err: &ExtractionError) -> Self {
        match err {
            ExtractionError::InvalidInput(_)
            | ExtractionError::UnsupportedDomain { .. }
            | ExtractionError::NotAJobPosting(_) => PipelineState::Rejected,
            ExtractionError::FetchFailed(_) | ExtractionError::LlmExtractionFailed(_) => {
                PipelineState::Failed
            }
        }
    }
}

/// Parses and screens a submitted URL. Performs no network activity.
pub fn validate_source_url(raw: &str) -> Result<Url, ExtractionError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ExtractionError::InvalidInput("A job URL is required.".to_string()));
    }

    let url = Url::parse(raw).map_err(|_| {
        ExtractionError::InvalidInput(
            "Please enter a valid URL, for example https://company.com/careers/123.".to_string(),
        )
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ExtractionError::InvalidInput(
            "Only http and https URLs can be imported.".to_string(),
        ));
    }

    let host = url
        .host_str()
        .ok_or_else(|| ExtractionError::InvalidInput("The URL has no host.".to_string()))?
        .trim_end_matches('.')
        .to_ascii_lowercase();

    if let Some(blocked) = DISALLOWED_DOMAINS
        .iter()
        .find(|d| host == d.domain || host.ends_with(&format!(".{}", d.domain)))
    {
        return Err(ExtractionError::UnsupportedDomain {
            host,
            code: blocked.code,
        });
    }

    Ok(url)
}

/// Sequences fetch → structured data → heuristic text → LLM fields.
pub struct JobExtractor {
    fetcher: Arc<dyn DocumentFetcher>,
    content: Arc<dyn ContentExtractor>,
    fields: Arc<dyn FieldExtractor>,
}

impl JobExtractor {
    pub fn new(
        fetcher: Arc<dyn DocumentFetcher>,
        content: Arc<dyn ContentExtractor>,
        fields: Arc<dyn FieldExtractor>,
    ) -> Self {
        Self {
            fetcher,
            content,
            fields,
        }
    }

    /// Runs the whole import for one URL. Every failure is logged here
    /// before it is returned.
    pub async fn extract(&self, raw_url: &str) -> Result<JobPostingRecord, ExtractionError> {
        debug!(state = %PipelineState::Init, "Importing job from {raw_url}");

        let result = self.run(raw_url).await;
        match &result {
            Ok(record) => info!(
                state = %PipelineState::Done,
                "Imported '{}' ({} chars of description)",
                record.job_title,
                record.job_description.chars().count()
            ),
            Err(e) => warn!(
                state = %PipelineState::for_error(e),
                code = e.code(),
                "Job import for {raw_url} stopped: {e}"
            ),
        }
        result
    }

    async fn run(&self, raw_url: &str) -> Result<JobPostingRecord, ExtractionError> {
        let url = validate_source_url(raw_url)?;
        debug!(state = %PipelineState::Validated, "{url}");

        let document = self.fetcher.fetch_document(&url).await?;
        info!(
            state = %PipelineState::Fetched,
            method = %document.method,
            "Fetched {} bytes from {url}",
            document.html.len()
        );

        if let Some(record) = extract_job_posting(&document.html) {
            info!(state = %PipelineState::StructuredMatch, "Found JobPosting structured data");
            return Ok(record);
        }

        let text = self.content.extract(&document.html);
        let chars = text.chars().count();
        debug!(
            state = %PipelineState::HeuristicExtracted,
            extractor = self.content.name(),
            "Extracted {chars} chars of page text"
        );

        if chars < MIN_CONTENT_CHARS {
            return Err(ExtractionError::NotAJobPosting(
                "The page does not contain enough text to be a job posting. \
                 Try pasting the job description instead."
                    .to_string(),
            ));
        }

        match self.fields.extract_fields(&text).await? {
            Some(record) => Ok(record),
            None => Err(ExtractionError::NotAJobPosting(
                "This page does not appear to be a job posting.".to_string(),
            )),
        }
    }
}
