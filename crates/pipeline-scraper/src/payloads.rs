//! Summariser-payload shaping helpers: paragraph-aware head/tail truncation
//! and heuristic candidate-tag extraction, grounded on
//! `scraper-py/app/payloads.py::{first_paragraphs,last_paragraphs,candidate_tags_from}`.
//! Neither spec.md nor SPEC_FULL.md names this behaviour explicitly — it is
//! a supplement filling in how `SummarizerIn.article.{text_head,text_tail}`
//! and `hints.candidate_tags` are actually populated.

const MAX_CANDIDATE_TAGS: usize = 6;

/// Leading paragraphs up to `max_chars`, never splitting a paragraph in half
/// unless it is the first one.
pub fn first_paragraphs(text: &str, max_chars: usize) -> String {
    let parts: Vec<&str> = text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()).collect();
    let mut out = Vec::new();
    let mut total = 0;
    for p in parts {
        if total + p.len() > max_chars && !out.is_empty() {
            break;
        }
        out.push(p);
        total += p.len();
    }
    truncate_chars(&out.join("\n\n"), max_chars)
}

/// Trailing paragraphs up to `max_chars`, built from the end backwards then
/// restored to document order.
pub fn last_paragraphs(text: &str, max_chars: usize) -> String {
    let mut parts: Vec<&str> = text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()).collect();
    parts.reverse();
    let mut out = Vec::new();
    let mut total = 0;
    for p in parts {
        if total + p.len() > max_chars && !out.is_empty() {
            break;
        }
        out.push(p);
        total += p.len();
    }
    out.reverse();
    truncate_chars(&out.join("\n\n"), max_chars)
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Heuristic candidate tags from the story title, headings, and URL path:
/// capitalised title tokens, the first word of each heading, and short
/// alphabetic path segments (title-cased), de-duplicated case-insensitively
/// and capped at 6.
pub fn candidate_tags_from(title: &str, headings: &[String], url_path: &str) -> Vec<String> {
    let mut tags = Vec::new();

    for token in title.replace('/', " ").split_whitespace() {
        if token.chars().next().is_some_and(|c| c.is_uppercase()) {
            let cleaned = token.trim_matches(|c: char| ".,:;!?".contains(c));
            if !cleaned.is_empty() {
                tags.push(cleaned.to_string());
            }
        }
    }

    for heading in headings {
        if let Some(first_word) = heading.split_whitespace().next() {
            tags.push(first_word.to_string());
        }
    }

    for seg in url_path.split('/') {
        if !seg.is_empty() && seg.len() <= 20 && seg.chars().all(|c| c.is_alphabetic()) {
            tags.push(title_case(seg));
        }
    }

    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for tag in tags {
        let key = tag.to_lowercase();
        if seen.insert(key) {
            out.push(tag);
            if out.len() >= MAX_CANDIDATE_TAGS {
                break;
            }
        }
    }
    out
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// `words < 100` and the raw HTML contains a subscribe/paywall marker,
/// matching `main.py`'s inline `is_paywalled` heuristic exactly.
pub fn is_paywalled(word_count: usize, html: &str) -> bool {
    if word_count >= 100 {
        return false;
    }
    let lower = html.to_lowercase();
    lower.contains("subscribe") || lower.contains("paywall")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_paragraphs_stops_before_exceeding_budget() {
        let text = "one two three\n\nfour five six\n\nseven eight nine";
        let head = first_paragraphs(text, 20);
        assert_eq!(head, "one two three");
    }

    #[test]
    fn last_paragraphs_keeps_document_order() {
        let text = "alpha\n\nbeta\n\ngamma";
        let tail = last_paragraphs(text, 10);
        assert_eq!(tail, "gamma");
    }

    #[test]
    fn candidate_tags_dedupes_case_insensitively_and_caps_at_six() {
        let headings = vec!["Rust Async".to_string(), "rust Basics".to_string()];
        let tags = candidate_tags_from("Rust Is Great", &headings, "/blog/rust-news");
        assert!(tags.len() <= MAX_CANDIDATE_TAGS);
        assert!(tags.iter().any(|t| t.eq_ignore_ascii_case("rust")));
    }

    #[test]
    fn paywall_heuristic_requires_both_short_text_and_marker() {
        assert!(is_paywalled(50, "<p>Please subscribe to continue reading</p>"));
        assert!(!is_paywalled(500, "<p>Please subscribe to continue reading</p>"));
        assert!(!is_paywalled(50, "<p>Totally free content here</p>"));
    }
}
