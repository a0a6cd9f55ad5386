//! Versioned job envelopes exchanged on the Redis queues, and the codec that
//! turns raw queue bytes into them. Shared by the scraper and summariser so
//! the wire shape is defined exactly once.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryRef {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hn_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// `ingest:out` / `scraper:retry` payload shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestJob {
    pub trace_id: String,
    pub story: StoryRef,
    #[serde(default)]
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArticleForSummary {
    pub id: String,
    pub language: String,
    pub word_count: usize,
    pub is_pdf: bool,
    pub is_paywalled: bool,
    pub text_head: String,
    pub headings: Vec<String>,
    pub text_tail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SummaryHints {
    pub candidate_tags: Vec<String>,
    pub source_reputation: f64,
}

/// `summarizer:in` payload shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerIn {
    pub trace_id: String,
    pub story: StoryRef,
    pub article: ArticleForSummary,
    #[serde(default)]
    pub hints: SummaryHints,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Value>,
    #[serde(default)]
    pub attempt: u32,
    pub schema_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LinkProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paywall: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pdf: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Classification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_category: Option<String>,
    #[serde(default = "default_article_type")]
    pub r#type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

fn default_article_type() -> String {
    "news".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UiLayer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_140: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quicktake: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_score: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_time_min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_props: Option<LinkProps>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timestamps {
    pub summarized_at: String,
}

/// `summarizer:out` payload shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerOut {
    pub trace_id: String,
    pub story_id: String,
    pub article_id: String,
    pub model: String,
    pub lang: String,
    pub summary: String,
    pub classification: Classification,
    pub ui: UiLayer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f64>>,
    pub timestamps: Timestamps,
    pub schema_version: u32,
}

/// Build a terminal dead-letter entry: verbatim payload plus failure reason,
/// as required by spec.md §7 ("every terminal DLQ entry carries the original
/// payload verbatim plus `{reason, err}`"). Each service nests the verbatim
/// payload under its own historical key (`job` for the scraper, `payload`
/// for the summariser/dispatcher) so this just takes that key name.
pub fn dlq_entry(reason: &str, err: &str, payload_key: &str, payload: Value) -> Value {
    serde_json::json!({
        "reason": reason,
        "err": err,
        payload_key: payload,
    })
}

/// Decode a raw queue item into JSON. A non-UTF8 or non-JSON payload is not
/// an error here — it becomes a `{"raw": <string>}` stub so the caller can
/// route it to DLQ as a poisoned message, per spec.md §4.1.
pub fn decode_queue_item(raw: &[u8]) -> Value {
    let text = String::from_utf8_lossy(raw);
    match serde_json::from_str::<Value>(&text) {
        Ok(v) => v,
        Err(_) => serde_json::json!({ "raw": text }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_valid_json() {
        let v = decode_queue_item(br#"{"a":1}"#);
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn wraps_invalid_json_as_raw_stub() {
        let v = decode_queue_item(b"not json");
        assert_eq!(v["raw"], "not json");
    }

    #[test]
    fn round_trips_ingest_job() {
        let job = IngestJob {
            trace_id: "t1".into(),
            story: StoryRef {
                id: "s1".into(),
                url: "https://example.com".into(),
                title: None,
                hn_id: None,
                source: None,
                created_at: None,
            },
            attempt: 0,
            visible_at: None,
        };
        let s = serde_json::to_string(&job).unwrap();
        let back: IngestJob = serde_json::from_str(&s).unwrap();
        assert_eq!(back.story.id, "s1");
    }
}
