use thiserror::Error;

use crate::job_import::fetcher::FetchError;
use crate::llm_client::LlmError;

/// Terminal outcome of a failed job import. Nothing here is retried.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(
        "{host} job pages require a signed-in session and cannot be imported. \
         Copy the job description from the page and paste it in instead."
    )]
    UnsupportedDomain { host: String, code: &'static str },

    #[error("Could not fetch the job page: {0}")]
    FetchFailed(#[from] FetchError),

    #[error("{0}")]
    NotAJobPosting(String),

    #[error("Job details could not be extracted: {0}")]
    LlmExtractionFailed(#[from] LlmError),
}

impl ExtractionError {
    /// Machine-readable reason code returned to clients.
    pub fn code(&self) -> &'static str {
        match self {
            ExtractionError::InvalidInput(_) => "INVALID_URL",
            ExtractionError::UnsupportedDomain { code, .. } => *code,
            ExtractionError::FetchFailed(_) => "FETCH_FAILED",
            ExtractionError::NotAJobPosting(_) => "NOT_A_JOB_POSTING",
            ExtractionError::LlmExtractionFailed(_) => "EXTRACTION_FAILED",
        }
    }

    /// Whether the failure is attributable to the submitted URL or page
    /// rather than to this service.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ExtractionError::LlmExtractionFailed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_domain_carries_its_code() {
        let err = ExtractionError::UnsupportedDomain {
            host: "www.linkedin.com".to_string(),
            code: "LINKEDIN_NOT_SUPPORTED",
        };
        assert_eq!(err.code(), "LINKEDIN_NOT_SUPPORTED");
        assert!(err.is_client_error());
        assert!(err.to_string().contains("paste"));
    }

    #[test]
    fn test_llm_failure_is_a_server_error() {
        let err = ExtractionError::from(LlmError::EmptyContent);
        assert_eq!(err.code(), "EXTRACTION_FAILED");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_not_a_job_posting_code() {
        let err = ExtractionError::NotAJobPosting("too short".to_string());
        assert_eq!(err.code(), "NOT_A_JOB_POSTING");
        assert_eq!(err.to_string(), "too short");
    }
}
