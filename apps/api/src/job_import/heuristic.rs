//! Heuristic text extraction for pages without structured data.
//!
//! `ContentExtractor` is the seam: the pipeline holds an
//! `Arc<dyn ContentExtractor>` so the heuristic can be swapped without
//! touching the orchestrator.

use scraper::{ElementRef, Html, Selector};

use crate::job_import::html::{collect_text, normalize_whitespace, truncate_chars};

/// Upper bound on text handed to the LLM stage.
pub const MAX_CONTENT_CHARS: usize = 12_000;

const EXCLUDED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer",
];

const BLOCK_CONTAINERS: &str = "article, section, div";

/// Isolates the main readable text of a page.
pub trait ContentExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns whitespace-normalized text of at most `MAX_CONTENT_CHARS` chars.
    fn extract(&self, html: &str) -> String;
}

/// "Most text wins": `<main>` if present, otherwise the block container
/// holding the most text, otherwise `<body>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DensityExtractor;

impl ContentExtractor for DensityExtractor {
    fn name(&self) -> &'static str {
        "density"
    }

    fn extract(&self, html: &str) -> String {
        let document = Html::parse_document(html);

        let text = main_text(&document)
            .or_else(|| densest_block_text(&document))
            .or_else(|| body_text(&document))
            .unwrap_or_default();

        // The cut may land on a space.
        truncate_chars(&text, MAX_CONTENT_CHARS).trim_end().to_string()
    }
}

fn is_excluded(element: ElementRef<'_>) -> bool {
    EXCLUDED_TAGS.contains(&element.value().name())
        || element
            .value()
            .attr("role")
            .is_some_and(|role| role.eq_ignore_ascii_case("navigation"))
}

fn inside_excluded(element: ElementRef<'_>) -> bool {
    element.ancestors().filter_map(ElementRef::wrap).any(is_excluded)
}

fn element_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(element, &is_excluded, &mut out);
    normalize_whitespace(&out)
}

fn candidates<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document
            .select(&selector)
            .filter(|el| !is_excluded(*el) && !inside_excluded(*el))
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn main_text(document: &Html) -> Option<String> {
    candidates(document, "main")
        .into_iter()
        .map(element_text)
        .find(|text| !text.is_empty())
}

fn densest_block_text(document: &Html) -> Option<String> {
    candidates(document, BLOCK_CONTAINERS)
        .into_iter()
        .map(element_text)
        .max_by_key(|text| text.chars().count())
        .filter(|text| !text.is_empty())
}

fn body_text(document: &Html) -> Option<String> {
    candidates(document, "body")
        .into_iter()
        .map(element_text)
        .find(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> String {
        DensityExtractor.extract(html)
    }

    #[test]
    fn test_main_element_is_preferred() {
        let html = format!(
            "<html><body><div>{}</div><main><h1>Job</h1><p>Short main text.</p></main></body></html>",
            "Unrelated sidebar content. ".repeat(50)
        );
        assert_eq!(extract(&html), "Job Short main text.");
    }

    #[test]
    fn test_navigation_chrome_is_removed() {
        let html = "<html><body><main>\
            <header>Site header</header>\
            <nav>Home | Jobs</nav>\
            <ul role=\"navigation\"><li>Breadcrumbs</li></ul>\
            <p>Role description.</p>\
            <footer>Copyright</footer>\
            <script>track()</script>\
            </main></body></html>";
        assert_eq!(extract(html), "Role description.");
    }

    #[test]
    fn test_densest_container_wins_without_main() {
        let html = "<html><body>\
            <section><p>Tiny</p></section>\
            <article><p>This article has considerably more text than the section.</p></article>\
            </body></html>";
        assert_eq!(
            extract(html),
            "This article has considerably more text than the section."
        );
    }

    #[test]
    fn test_containers_inside_navigation_are_ignored() {
        let html = format!(
            "<html><body><nav><div>{}</div></nav><div><p>Real posting text.</p></div></body></html>",
            "menu item ".repeat(100)
        );
        assert_eq!(extract(&html), "Real posting text.");
    }

    #[test]
    fn test_body_fallback() {
        let html = "<html><body>Plain <span>body</span> text</body></html>";
        assert_eq!(extract(html), "Plain body text");
    }

    #[test]
    fn test_empty_page_yields_empty_text() {
        assert_eq!(extract("<html><body><script>x()</script></body></html>"), "");
    }

    #[test]
    fn test_output_is_truncated() {
        let html = format!("<html><body><main>{}</main></body></html>", "word ".repeat(5_000));
        let text = extract(&html);
        assert!(text.chars().count() <= MAX_CONTENT_CHARS);
        assert!(text.starts_with("word word"));
    }

    #[test]
    fn test_truncated_output_stays_normalized() {
        // 12,000 chars of "word " ends exactly on a space.
        let html = format!("<html><body><main>{}</main></body></html>", "word ".repeat(5_000));
        let text = extract(&html);
        assert_eq!(normalize_whitespace(&text), text);
        assert!(text.ends_with("word"));
        assert_eq!(text.chars().count(), MAX_CONTENT_CHARS - 1);
    }

    #[test]
    fn test_inline_markup_does_not_split_words() {
        let html = "<html><body><main><p><b>Sen</b>ior <a href=\"/r\">Rust</a>acean</p><p>Remote</p></main></body></html>";
        assert_eq!(extract(html), "Senior Rustacean Remote");
    }

    #[test]
    fn test_output_is_already_normalized() {
        let html = "<html><body><main>\n  <h1>Data   Analyst</h1>\n\t<p>Remote\n role</p></main></body></html>";
        let text = extract(html);
        assert_eq!(text, "Data Analyst Remote role");
        assert_eq!(normalize_whitespace(&text), text);
    }
}
