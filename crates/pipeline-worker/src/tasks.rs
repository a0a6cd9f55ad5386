//! Per-queue task handlers (spec.md §4.8), ported from
//! `worker-py/app/tasks/{fetch_article,summarize,embed,tag,refresh_stats}.py`.
//! Each returns the `result` object the dispatcher inspects for
//! `article_id`/`story_id` before enqueuing follow-ons.

use std::time::Duration;

use serde_json::{json, Value};
use sqlx::PgPool;

use pipeline_core::extract::simple_extract_text;

use crate::embedder::deterministic_embed;
use crate::store;
use crate::summarizer::simple_summarize;

const KEYWORDS: &[(&str, &[&str])] = &[
    ("ai", &["ai", "artificial intelligence", "gpt", "llm", "openai"]),
    (
        "security",
        &["security", "vuln", "cve", "xss", "csrf", "rce", "encryption"],
    ),
    ("show", &["show hn"]),
];

/// Direct fetch + plain-DOM extraction + article upsert + story link. A
/// simpler sibling of the scraper's own pipeline: no retry/DLQ
/// sophistication of its own (the dispatcher's generic retry wraps it),
/// no headless fallback, no content-hash dedup beyond what `store` already
/// does.
pub async fn handle_fetch_article(
    pool: &PgPool,
    timeout: Duration,
    job: &Value,
) -> anyhow::Result<Value> {
    let story_id = job
        .get("story_id")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("invalid_job_payload"))?;

    let url = match job.get("url").and_then(Value::as_str) {
        Some(u) if !u.is_empty() => u.to_string(),
        _ => {
            let (url, _title) = store::get_story_url_title(pool, story_id).await?;
            url
        }
    };

    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let resp = client.get(&url).send().await?.error_for_status()?;
    let html = resp.text().await?;

    let text = simple_extract_text(&html);
    let article_id = store::upsert_article_from_text(pool, &text, "en").await?;
    store::link_story_article(pool, story_id, article_id).await?;

    Ok(json!({ "article_id": article_id.to_string() }))
}

/// In-process stand-in for the original `POST /summarize` call: fetch the
/// article text, run the heuristic summarizer, persist it.
pub async fn handle_summarize(pool: &PgPool, job: &Value) -> anyhow::Result<Value> {
    let article_id = job
        .get("article_id")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("invalid_job_payload"))?;
    let model = job.get("model").and_then(Value::as_str).unwrap_or("gpt-4.1");
    let lang = job.get("lang").and_then(Value::as_str).unwrap_or("en");

    let (text, _article_lang) = store::fetch_article_text(pool, article_id).await?;
    let summary = simple_summarize(&text, 3);
    store::upsert_summary(pool, article_id, model, lang, &summary).await?;

    Ok(json!({ "article_id": article_id, "summary": summary }))
}

/// In-process stand-in for the original `POST /embed` call.
pub async fn handle_embed(pool: &PgPool, job: &Value) -> anyhow::Result<Value> {
    let article_id = job
        .get("article_id")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("invalid_job_payload"))?;
    let model_key = job.get("model_key").and_then(Value::as_str).unwrap_or("default");

    let (text, _lang) = store::fetch_article_text(pool, article_id).await?;
    let dims = store::get_embedding_dims(pool, model_key).await?;

    let vector = deterministic_embed(&text, dims as usize);
    store::upsert_embedding(pool, article_id, model_key, &vector).await?;

    Ok(json!({ "article_id": article_id, "model_key": model_key, "dims": dims }))
}

/// Keyword-match tagging against a small static table; always returns
/// quickly, attaching whichever tags matched (possibly none).
pub async fn handle_tag(pool: &PgPool, job: &Value) -> anyhow::Result<Value> {
    let story_id = job
        .get("story_id")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("invalid_job_payload"))?;

    let title = match job.get("title").and_then(Value::as_str) {
        Some(t) if !t.is_empty() => Some(t.to_string()),
        _ => store::get_story_url_title(pool, story_id).await?.1,
    };
    let text = format!(
        "{} {}",
        job.get("text").and_then(Value::as_str).unwrap_or(""),
        title.as_deref().unwrap_or("")
    );
    let matched = matching_tags(&text);

    for slug in &matched {
        let tag_id = store::get_or_create_tag(pool, slug, None).await?;
        store::attach_tag_to_story(pool, story_id, tag_id).await?;
    }

    Ok(json!({ "tags": matched }))
}

pub async fn handle_refresh_hn_stats(pool: &PgPool, job: &Value) -> anyhow::Result<Value> {
    let hours = job.get("hours").and_then(Value::as_i64).unwrap_or(48);
    let updated = store::refresh_recent_hot_scores(pool, hours).await?;
    Ok(json!({ "updated": updated }))
}

/// Case-insensitive keyword match against `KEYWORDS`, sorted for a stable
/// wire shape.
fn matching_tags(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    let mut matched: Vec<&str> = KEYWORDS
        .iter()
        .filter(|(_, kws)| kws.iter().any(|kw| lower.contains(kw)))
        .map(|(slug, _)| *slug)
        .collect();
    matched.sort_unstable();
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_ai_keyword_case_insensitively() {
        assert_eq!(matching_tags("New GPT model released"), vec!["ai"]);
    }

    #[test]
    fn matches_multiple_categories_sorted() {
        assert_eq!(
            matching_tags("Show HN: a tool with an RCE vuln"),
            vec!["security", "show"]
        );
    }

    #[test]
    fn no_match_yields_empty() {
        assert!(matching_tags("just a regular article about gardening").is_empty());
    }
}
