// LLM prompt constants for job import.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, NO_INVENTION_INSTRUCTION};

/// Legacy answer some deployments still return for non-job pages.
pub const NOT_JOB_POSTING_SENTINEL: &str = "NOT_JOB_POSTING";

const JOB_FIELDS_ROLE: &str = "You are a precise job posting extraction engine. \
    You read the text of a web page and return the job posting it contains as JSON.";

/// Field extraction prompt template. Replace `{page_text}` before sending.
pub const JOB_FIELDS_PROMPT_TEMPLATE: &str = r#"Extract the job posting from the web page text below.

If the text describes a job opening, return a JSON object with this EXACT schema (no extra fields):
{
  "isJobPosting": true,
  "jobTitle": "Senior Data Analyst",
  "companyName": "Acme Corp",
  "jobDescription": "The full job description as readable plain text"
}

If the text does NOT describe a job opening (for example a login wall, an error page,
a list of many jobs, or a company homepage), return exactly:
{
  "isJobPosting": false
}

Rules:
- jobTitle: the title of the position as written on the page.
- companyName: the hiring company. Use "" if the page does not name one.
- jobDescription: the COMPLETE description, including responsibilities, requirements,
  qualifications, benefits, salary and location details when present. Keep paragraph and
  bullet structure using line breaks. Drop navigation, cookie banners, and unrelated links.
- {no_invention}

Web page text:
"""
{page_text}
""""#;

/// System prompt for field extraction. Enforces JSON-only output.
pub fn job_fields_system() -> String {
    format!("{JOB_FIELDS_ROLE} {JSON_ONLY_SYSTEM}")
}

/// Builds the user prompt for one page.
pub fn job_fields_prompt(page_text: &str) -> String {
    JOB_FIELDS_PROMPT_TEMPLATE
        .replace("{no_invention}", NO_INVENTION_INSTRUCTION.trim())
        .replace("{page_text}", page_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_page_text() {
        let prompt = job_fields_prompt("Senior Rust Engineer at Initech");
        assert!(prompt.contains("Senior Rust Engineer at Initech"));
        assert!(!prompt.contains("{page_text}"));
        assert!(prompt.contains("Do NOT infer"));
    }

    #[test]
    fn test_system_prompt_mentions_json() {
        // JSON mode is rejected unless the conversation mentions JSON.
        assert!(job_fields_system().contains("valid JSON only"));
    }
}
