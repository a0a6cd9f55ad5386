//! Naive first-N-sentences summary for dev/test use without an LLM call,
//! ported from `summarizer-py/app/services/summarizer.py`.

const MAX_SUMMARY_CHARS: usize = 2000;

pub fn simple_summarize(text: &str, max_sentences: usize) -> String {
    if text.is_empty() {
        return String::new();
    }

    let normalized = text.replace('\n', " ");
    let sentences: Vec<String> = normalized
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let mut snippet = sentences
        .into_iter()
        .take(max_sentences)
        .collect::<Vec<_>>()
        .join(". ");
    if !snippet.is_empty() && !snippet.ends_with('.') {
        snippet.push('.');
    }
    snippet.chars().take(MAX_SUMMARY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_n_sentences_and_appends_period() {
        let text = "First sentence. Second sentence. Third sentence. Fourth.";
        assert_eq!(simple_summarize(text, 2), "First sentence. Second sentence.");
    }

    #[test]
    fn empty_text_yields_empty_summary() {
        assert_eq!(simple_summarize("", 3), "");
    }

    #[test]
    fn caps_at_max_chars() {
        let text = format!("{}.", "x".repeat(5000));
        assert_eq!(simple_summarize(&text, 1).chars().count(), MAX_SUMMARY_CHARS);
    }
}
