//! HTML → (text, headings, author) with a library-first, DOM-fallback
//! strategy (spec.md §4.4).

use dom_smoothie::{Article, Config as ReadabilityConfig, Readability};
use scraper::{Html, Selector};

#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub text: String,
    pub headings: Vec<String>,
    pub author: Option<String>,
}

/// Runs `dom_smoothie` (a Readability-algorithm port) first; on non-empty
/// output it is paired with a `scraper` DOM pass for headings and the
/// `<meta name="author">` tag. On failure or empty output, falls back
/// entirely to the DOM pass.
pub fn extract(html: &str, url: &str) -> Extracted {
    let (headings, author) = dom_metadata(html);

    let readability_text = extract_readability(html, url);
    match readability_text {
        Some(text) if !text.trim().is_empty() => Extracted {
            text,
            headings,
            author,
        },
        _ => Extracted {
            text: dom_fallback_text(html),
            headings,
            author,
        },
    }
}

fn extract_readability(html: &str, url: &str) -> Option<String> {
    let mut readability = Readability::new(html, Some(url), Some(ReadabilityConfig::default())).ok()?;
    let Article { text_content, .. } = readability.parse().ok()?;
    Some(text_content.trim().to_string())
}

/// First five `h1|h2|h3` headings, in document order, and the
/// `<meta name="author">` content attribute if present.
fn dom_metadata(html: &str) -> (Vec<String>, Option<String>) {
    let doc = Html::parse_document(html);

    let heading_sel = Selector::parse("h1, h2, h3").unwrap();
    let headings = doc
        .select(&heading_sel)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .take(5)
        .collect();

    let author_sel = Selector::parse(r#"meta[name="author"]"#).unwrap();
    let author = doc
        .select(&author_sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    (headings, author)
}

/// Strip `script|style|noscript`, join non-empty `<p>` text with `\n\n`; if
/// no paragraphs, use whole-document text. Shared with the dispatcher's
/// `FETCH_ARTICLE` task, since both need the same simple DOM pass when a
/// full readability extraction isn't warranted.
fn dom_fallback_text(html: &str) -> String {
    pipeline_core::extract::simple_extract_text(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dom_fallback_joins_paragraphs() {
        let html = "<html><body><p>Hello world.</p><p>Second para.</p></body></html>";
        let text = dom_fallback_text(html);
        assert_eq!(text, "Hello world.\n\nSecond para.");
    }

    #[test]
    fn dom_metadata_collects_headings_and_author() {
        let html = r#"<html><head><meta name="author" content="Jane Doe"></head>
            <body><h1>Title</h1><h2>Sub</h2><p>body</p></body></html>"#;
        let (headings, author) = dom_metadata(html);
        assert_eq!(headings, vec!["Title".to_string(), "Sub".to_string()]);
        assert_eq!(author.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn dom_fallback_whole_document_when_no_paragraphs() {
        let html = "<html><body><div>Just a div</div></body></html>";
        let text = dom_fallback_text(html);
        assert!(text.contains("Just a div"));
    }
}
