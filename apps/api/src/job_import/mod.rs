// Job import: turns a job-posting URL into a normalized JobPostingRecord.
// Stages run in order: fetcher -> structured -> heuristic -> fields.
// The pipeline module sequences them; handlers exposes it over HTTP.

pub mod error;
pub mod fetcher;
pub mod fields;
pub mod handlers;
pub mod heuristic;
pub mod html;
pub mod pipeline;
pub mod prompts;
pub mod structured;

use serde::{Deserialize, Serialize};

pub use error::ExtractionError;
pub use pipeline::JobExtractor;

/// The canonical output of a job import.
/// `job_title` and `job_description` are non-empty whenever a record is returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPostingRecord {
    pub job_title: String,
    #[serde(default)]
    pub company_name: String,
    pub job_description: String,
}

impl JobPostingRecord {
    /// Builds a record from raw field values, trimming each one.
    /// Returns `None` when the title or description ends up empty.
    pub fn from_parts(title: &str, company: &str, description: &str) -> Option<Self> {
        let job_title = title.trim();
        let job_description = description.trim();
        if job_title.is_empty() || job_description.is_empty() {
            return None;
        }
        Some(Self {
            job_title: job_title.to_string(),
            company_name: company.trim().to_string(),
            job_description: job_description.to_string(),
        })
    }
}
