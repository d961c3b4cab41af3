//! Structured-data extraction: reads schema.org `JobPosting` annotations
//! from `application/ld+json` blocks. Never fails; a miss returns `None`.

use scraper::{Html, Selector};
use serde_json::Value;

use crate::job_import::html::html_to_text;
use crate::job_import::JobPostingRecord;

const JOB_POSTING_TYPE: &str = "JobPosting";

/// Classification of one JSON-LD item.
#[derive(Debug)]
enum LdItem {
    JobPosting(JobPostingRecord),
    Other,
}

/// Classification of one `<script type="application/ld+json">` block.
#[derive(Debug)]
enum LdBlock {
    Parsed(Vec<LdItem>),
    Unparsable,
}

impl LdBlock {
    fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => {
                let mut items = Vec::new();
                flatten_items(&value, &mut items);
                LdBlock::Parsed(items.into_iter().map(classify).collect())
            }
            Err(_) => LdBlock::Unparsable,
        }
    }

    fn into_job_posting(self) -> Option<JobPostingRecord> {
        match self {
            LdBlock::Parsed(items) => items.into_iter().find_map(|item| match item {
                LdItem::JobPosting(record) => Some(record),
                LdItem::Other => None,
            }),
            LdBlock::Unparsable => None,
        }
    }
}

/// Returns the first complete `JobPosting` embedded in the page, if any.
pub fn extract_job_posting(html: &str) -> Option<JobPostingRecord> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    document
        .select(&selector)
        .map(|script| LdBlock::parse(&script.text().collect::<String>()))
        .find_map(LdBlock::into_job_posting)
}

/// Top-level objects, array members, and `@graph` members, in document order.
fn flatten_items<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| flatten_items(item, out)),
        Value::Object(map) => {
            out.push(value);
            if let Some(graph) = map.get("@graph") {
                flatten_items(graph, out);
            }
        }
        _ => {}
    }
}

fn classify(item: &Value) -> LdItem {
    if !is_job_posting(item) {
        return LdItem::Other;
    }

    let title = string_field(item, "title").or_else(|| string_field(item, "name"));
    let description = string_field(item, "description");
    let (Some(title), Some(description)) = (title, description) else {
        return LdItem::Other;
    };

    let company = organization_name(item.get("hiringOrganization"))
        .or_else(|| organization_name(item.get("employer")))
        .unwrap_or_default();

    match JobPostingRecord::from_parts(&html_to_text(title), &company, &html_to_text(description)) {
        Some(record) => LdItem::JobPosting(record),
        None => LdItem::Other,
    }
}

fn is_job_posting(item: &Value) -> bool {
    match item.get("@type") {
        Some(Value::String(t)) => t == JOB_POSTING_TYPE,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(JOB_POSTING_TYPE)),
        _ => false,
    }
}

fn string_field<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn organization_name(org: Option<&Value>) -> Option<String> {
    let org = org?;
    match org {
        Value::String(name) => Some(name.trim().to_string()),
        Value::Object(_) => string_field(org, "name").map(str::to_string),
        Value::Array(orgs) => orgs.iter().find_map(|o| organization_name(Some(o))),
        _ => None,
    }
    .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(blocks: &[&str]) -> String {
        let scripts: String = blocks
            .iter()
            .map(|b| format!(r#"<script type="application/ld+json">{b}</script>"#))
            .collect();
        format!("<html><head>{scripts}</head><body><p>Careers</p></body></html>")
    }

    #[test]
    fn test_extracts_acme_data_analyst() {
        let html = page(&[
            r#"{"@type":"JobPosting","title":"Data Analyst","description":"<p>Analyze data.</p>","hiringOrganization":{"name":"Acme"}}"#,
        ]);
        let record = extract_job_posting(&html).unwrap();
        assert_eq!(record.job_title, "Data Analyst");
        assert_eq!(record.company_name, "Acme");
        assert_eq!(record.job_description, "Analyze data.");
    }

    #[test]
    fn test_malformed_block_is_skipped() {
        let html = page(&[
            r#"{"@type": "JobPosting", "title": "#,
            r#"{"@type":"JobPosting","title":"Backend Engineer","description":"Build APIs."}"#,
        ]);
        let record = extract_job_posting(&html).unwrap();
        assert_eq!(record.job_title, "Backend Engineer");
        assert_eq!(record.company_name, "");
    }

    #[test]
    fn test_array_of_items_and_type_list() {
        let html = page(&[
            r#"[{"@type":"Organization","name":"Acme"},
                {"@type":["Thing","JobPosting"],"name":"Platform Engineer","description":"Run infra.","employer":{"name":"Initech"}}]"#,
        ]);
        let record = extract_job_posting(&html).unwrap();
        assert_eq!(record.job_title, "Platform Engineer");
        assert_eq!(record.company_name, "Initech");
    }

    #[test]
    fn test_graph_container_is_searched() {
        let html = page(&[
            r#"{"@context":"https://schema.org","@graph":[
                {"@type":"WebPage","name":"Careers"},
                {"@type":"JobPosting","title":"Designer","description":"Design things.","hiringOrganization":"Globex"}]}"#,
        ]);
        let record = extract_job_posting(&html).unwrap();
        assert_eq!(record.job_title, "Designer");
        assert_eq!(record.company_name, "Globex");
    }

    #[test]
    fn test_posting_without_description_is_ignored() {
        let html = page(&[
            r#"{"@type":"JobPosting","title":"Incomplete"}"#,
            r#"{"@type":"JobPosting","title":"Complete","description":"All fields."}"#,
        ]);
        assert_eq!(extract_job_posting(&html).unwrap().job_title, "Complete");
    }

    #[test]
    fn test_non_job_types_return_none() {
        let html = page(&[r#"{"@type":"Organization","name":"Acme","description":"We make anvils."}"#]);
        assert!(extract_job_posting(&html).is_none());
    }

    #[test]
    fn test_page_without_structured_data_returns_none() {
        assert!(extract_job_posting("<html><body><h1>Jobs</h1></body></html>").is_none());
    }

    #[test]
    fn test_escaped_html_description_is_stripped() {
        let html = page(&[
            r#"{"@type":"JobPosting","title":"Writer","description":"&lt;p&gt;Write &amp;amp; edit.&lt;/p&gt;"}"#,
        ]);
        assert_eq!(extract_job_posting(&html).unwrap().job_description, "Write & edit.");
    }
}
