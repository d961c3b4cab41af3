//! LLM field extraction for pages without structured data.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::job_import::html::truncate_chars;
use crate::job_import::prompts::{job_fields_prompt, job_fields_system, NOT_JOB_POSTING_SENTINEL};
use crate::job_import::JobPostingRecord;
use crate::llm_client::{strip_json_fences, CompletionOptions, LlmClient, LlmError};

/// Turns page text into a `JobPostingRecord`.
///
/// `Ok(None)` means the page is not a job posting (or the answer was
/// unusable); `Err` means the extraction service itself failed.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract_fields(&self, page_text: &str) -> Result<Option<JobPostingRecord>, LlmError>;
}

/// One JSON-mode completion per page, near-deterministic sampling.
pub struct LlmFieldExtractor {
    llm: LlmClient,
    options: CompletionOptions,
}

impl LlmFieldExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self {
            llm,
            options: CompletionOptions {
                temperature: 0.1,
                max_tokens: 4000,
                json_mode: true,
            },
        }
    }
}

#[async_trait]
impl FieldExtractor for LlmFieldExtractor {
    async fn extract_fields(&self, page_text: &str) -> Result<Option<JobPostingRecord>, LlmError> {
        let answer = self
            .llm
            .call_text(&job_fields_prompt(page_text), &job_fields_system(), self.options)
            .await?;

        let record = parse_extraction_answer(&answer);
        if record.is_none() {
            debug!("LLM answer did not contain a job posting: {}", preview(&answer));
        }
        Ok(record)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractionAnswer {
    is_job_posting: Option<bool>,
    job_title: Option<String>,
    company_name: Option<String>,
    job_description: Option<String>,
}

/// Interprets the model's answer.
///
/// Returns `None` when the model reports `"isJobPosting": false`, answers
/// with the bare `NOT_JOB_POSTING` sentinel (or any non-JSON text), or
/// omits the title or description. A well-formed record is accepted even
/// if its description happens to mention the sentinel string.
pub fn parse_extraction_answer(answer: &str) -> Option<JobPostingRecord> {
    let answer = strip_json_fences(answer);
    let parsed: ExtractionAnswer = serde_json::from_str(answer).ok()?;

    if parsed.is_job_posting == Some(false) {
        return None;
    }

    let title = parsed.job_title.unwrap_or_default();
    if title.trim() == NOT_JOB_POSTING_SENTINEL {
        return None;
    }

    JobPostingRecord::from_parts(
        &title,
        parsed.company_name.as_deref().unwrap_or_default(),
        parsed.job_description.as_deref().unwrap_or_default(),
    )
}

fn preview(text: &str) -> &str {
    truncate_chars(text, 200)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_parses_complete_answer() {
        let record = parse_extraction_answer(
            r#"{"isJobPosting": true, "jobTitle": "Data Analyst", "companyName": "Acme", "jobDescription": "Analyze data."}"#,
        )
        .unwrap();
        assert_eq!(record.job_title, "Data Analyst");
        assert_eq!(record.company_name, "Acme");
        assert_eq!(record.job_description, "Analyze data.");
    }

    #[test]
    fn test_missing_flag_and_company_are_tolerated() {
        let record =
            parse_extraction_answer(r#"{"jobTitle": "Engineer", "jobDescription": "Build things."}"#)
                .unwrap();
        assert_eq!(record.company_name, "");
    }

    #[test]
    fn test_bare_sentinel_means_not_a_job() {
        assert!(parse_extraction_answer("NOT_JOB_POSTING").is_none());
        assert!(parse_extraction_answer("\"NOT_JOB_POSTING\"").is_none());
        assert!(parse_extraction_answer("Sorry, NOT_JOB_POSTING.").is_none());
    }

    #[test]
    fn test_sentinel_in_title_means_not_a_job() {
        assert!(parse_extraction_answer(
            r#"{"jobTitle": "NOT_JOB_POSTING", "jobDescription": "n/a"}"#
        )
        .is_none());
    }

    #[test]
    fn test_structured_flag_means_not_a_job() {
        assert!(parse_extraction_answer(r#"{"isJobPosting": false}"#).is_none());
        assert!(parse_extraction_answer(
            r#"{"isJobPosting": false, "jobTitle": "Careers", "jobDescription": "Join us"}"#
        )
        .is_none());
    }

    #[test]
    fn test_description_mentioning_sentinel_is_still_a_job() {
        let record = parse_extraction_answer(
            r#"{"isJobPosting": true, "jobTitle": "QA Engineer", "jobDescription": "Test the NOT_JOB_POSTING classifier."}"#,
        );
        assert!(record.is_some());
    }

    #[test]
    fn test_invalid_or_incomplete_answers_are_rejected() {
        assert!(parse_extraction_answer("{not json").is_none());
        assert!(parse_extraction_answer(r#"{"jobTitle": "", "jobDescription": "x"}"#).is_none());
        assert!(parse_extraction_answer(r#"{"jobTitle": "Engineer"}"#).is_none());
    }

    #[test]
    fn test_fenced_answer_is_accepted() {
        let answer = "```json\n{\"jobTitle\": \"Engineer\", \"jobDescription\": \"Build.\"}\n```";
        assert!(parse_extraction_answer(answer).is_some());
    }

    #[tokio::test]
    async fn test_llm_field_extractor_sends_page_text() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/openai/deployments/gpt-4o/chat/completions")
                .body_contains("Senior Rust Engineer")
                .json_body_partial(r#"{"temperature": 0.1, "max_tokens": 4000}"#);
            then.status(200).json_body(json!({
                "choices": [{
                    "message": {"content": "{\"isJobPosting\": true, \"jobTitle\": \"Senior Rust Engineer\", \"companyName\": \"Initech\", \"jobDescription\": \"Write Rust.\"}"},
                    "finish_reason": "stop"
                }]
            }));
        });

        let llm = LlmClient::new(server.base_url(), "key", "gpt-4o", "2024-08-01-preview").unwrap();
        let record = LlmFieldExtractor::new(llm)
            .extract_fields("Senior Rust Engineer at Initech. Write Rust.")
            .await
            .unwrap()
            .unwrap();

        mock.assert();
        assert_eq!(record.company_name, "Initech");
    }

    #[tokio::test]
    async fn test_llm_field_extractor_propagates_api_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST);
            then.status(500).body("boom");
        });

        let llm = LlmClient::new(server.base_url(), "key", "gpt-4o", "2024-08-01-preview").unwrap();
        let err = LlmFieldExtractor::new(llm)
            .extract_fields("page text")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 500, .. }));
    }
}
