//! The plain DOM-pass text extraction shared by the scraper's fallback path
//! and the dispatcher's `FETCH_ARTICLE` batch task, grounded on
//! `worker-py/app/tasks/fetch_article.py::extract_main_text` (a simpler
//! sibling of the scraper service's own readability-first extractor).
//! Strips `script|style|noscript`, joins non-empty `<p>` text with `\n\n`,
//! and falls back to whole-document text if there are no paragraphs.

use scraper::{Html, Selector};

pub fn simple_extract_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let p_sel = Selector::parse("p").unwrap();

    let paragraphs: Vec<String> = doc
        .select(&p_sel)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if !paragraphs.is_empty() {
        return paragraphs.join("\n\n");
    }

    let mut buf = String::new();
    collect_text_excluding(doc.root_element(), &mut buf);
    buf.split_whitespace().collect::<Vec<_>>().join(" ")
}

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript"];

fn collect_text_excluding(el: scraper::ElementRef, buf: &mut String) {
    use scraper::node::Node;

    if SKIPPED_TAGS.contains(&el.value().name()) {
        return;
    }
    for child in el.children() {
        match child.value() {
            Node::Text(text) => {
                buf.push_str(text);
                buf.push(' ');
            }
            Node::Element(_) => {
                if let Some(child_el) = scraper::ElementRef::wrap(child) {
                    collect_text_excluding(child_el, buf);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paragraphs_with_blank_line() {
        let html = "<html><body><p>Hello world.</p><p>Second para.</p></body></html>";
        assert_eq!(simple_extract_text(html), "Hello world.\n\nSecond para.");
    }

    #[test]
    fn falls_back_to_whole_document_text() {
        let html = "<html><body><div>Just a div</div></body></html>";
        assert!(simple_extract_text(html).contains("Just a div"));
    }

    #[test]
    fn skips_script_and_style_content() {
        let html = "<html><body><script>evil()</script><div>Safe text</div></body></html>";
        let text = simple_extract_text(html);
        assert!(text.contains("Safe text"));
        assert!(!text.contains("evil"));
    }
}
