//! Text helpers shared by the extraction stages.

use scraper::{ElementRef, Html, Node};

/// Elements whose text never counts as visible page content.
const SCRIPT_TAGS: &[&str] = &["script", "style", "template"];

/// Elements that start a new line when converting markup to plain text.
const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "br",
    "dd",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "td",
    "th",
    "title",
    "tr",
    "ul",
];

/// Collects the text under `element`, skipping every subtree for which
/// `skip` returns true. A space follows each block element so adjacent
/// blocks never run together; inline elements join their neighbours.
pub fn collect_text<F>(element: ElementRef<'_>, skip: &F, out: &mut String)
where
    F: Fn(ElementRef<'_>) -> bool,
{
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !skip(child_el) {
                        collect_text(child_el, skip, out);
                        if BLOCK_TAGS.contains(&child_el.value().name()) {
                            out.push(' ');
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Text a reader would see, with script and style content removed.
/// Whitespace is normalized.
pub fn visible_text(document: &Html) -> String {
    let mut out = String::new();
    collect_text(
        document.root_element(),
        &|el: ElementRef<'_>| SCRIPT_TAGS.contains(&el.value().name()),
        &mut out,
    );
    normalize_whitespace(&out)
}

/// Collapses every whitespace run to a single space and trims the ends.
/// Idempotent.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns at most `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Converts an HTML fragment (such as a JSON-LD `description`) to readable
/// plain text. Block elements become line breaks and entities are decoded.
/// Markup that was itself entity-escaped is unescaped and stripped too.
pub fn html_to_text(fragment: &str) -> String {
    let text = fragment_to_text(fragment);
    if looks_like_markup(&text) {
        fragment_to_text(&text)
    } else {
        text
    }
}

fn fragment_to_text(fragment: &str) -> String {
    let parsed = Html::parse_fragment(fragment);
    let mut raw = String::new();
    push_block_text(parsed.root_element(), &mut raw);

    let mut lines: Vec<String> = Vec::new();
    for line in raw.lines() {
        let line = normalize_whitespace(line);
        if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

fn push_block_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SCRIPT_TAGS.contains(&name) {
                    continue;
                }
                let is_block = BLOCK_TAGS.contains(&name);
                if is_block {
                    out.push('\n');
                }
                if name == "li" {
                    out.push_str("- ");
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    push_block_text(child_el, out);
                }
                if is_block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn looks_like_markup(text: &str) -> bool {
    text.contains("</") || text.contains("<br") || text.contains("<p>")
}
