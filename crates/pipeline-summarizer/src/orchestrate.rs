//! Summariser orchestration: validate → claim → LLM call (bounded retry) →
//! assemble/validate output → emit, or DLQ/retry on failure (spec.md §4.7).

use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use pipeline_core::envelope::{
    self, Classification, LinkProps, SummarizerIn, SummarizerOut, Timestamps, UiLayer,
};
use pipeline_core::idempotency;
use pipeline_core::queue::{PopEnd, Queue};

use crate::config::SummarizerConfig;
use crate::disposition::SummarizerReason;
use crate::llm::{LlmClient, LlmResult};
use crate::validate;

pub enum Outcome {
    Done,
    SkippedIdempotent,
    Requeued,
    Dlq(SummarizerReason),
}

/// Validated-input errors that always route straight to DLQ with
/// `SCHEMA_MISMATCH`, mirroring `schemas.py::SummarizerIn`'s field
/// validators expressed as plain checks rather than a macro-driven schema.
fn validate_input(cfg: &SummarizerConfig, job: &SummarizerIn) -> Result<(), String> {
    if job.schema_version != cfg.schema_version {
        return Err(format!(
            "schema_version_mismatch: expected {}, got {}",
            cfg.schema_version, job.schema_version
        ));
    }
    if job.story.id.trim().is_empty() {
        return Err("story.id missing".to_string());
    }
    if job.article.id.trim().is_empty() {
        return Err("article.id missing".to_string());
    }
    let lang_len = job.article.language.chars().count();
    if !(2..=5).contains(&lang_len) {
        return Err(format!("language out of range: {:?}", job.article.language));
    }
    Ok(())
}

pub async fn process_job(
    cfg: &SummarizerConfig,
    queue: &Queue,
    llm: &LlmClient,
    raw: Value,
) -> Outcome {
    let job: SummarizerIn = match serde_json::from_value(raw.clone()) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "summarizer.payload.invalid");
            return dlq(queue, cfg, &raw, SummarizerReason::SchemaMismatch, &e.to_string()).await;
        }
    };

    if let Err(reason) = validate_input(cfg, &job) {
        warn!(trace_id = %job.trace_id, reason, "summarizer.schema_mismatch");
        return dlq(queue, cfg, &raw, SummarizerReason::SchemaMismatch, &reason).await;
    }

    let done_key = idempotency::summarizer_done_key(&job.article.id, &cfg.llm.model);
    match idempotency::claim(queue, &done_key, idempotency::DEFAULT_TTL).await {
        Ok(true) => {}
        Ok(false) => {
            info!(trace_id = %job.trace_id, article_id = %job.article.id, "summarizer.idempotent.skip");
            return Outcome::SkippedIdempotent;
        }
        Err(e) => {
            warn!(error = %e, "summarizer.idempotency_claim.failed");
            return requeue(queue, cfg, &raw, &job, SummarizerReason::Unknown, &e.to_string()).await;
        }
    }

    let domain = job.story.source.clone().unwrap_or_default();
    let result = llm
        .summarize_with_retry(&job.story, &domain, &job.article, &job.hints, job.metrics.as_ref())
        .await;

    let llm_result = match result {
        Ok(r) => r,
        Err(e) => {
            let reason = SummarizerReason::from(&e);
            warn!(trace_id = %job.trace_id, error = %e, reason = %reason, "summarizer.llm.failed");
            return requeue(queue, cfg, &raw, &job, reason, &e.to_string()).await;
        }
    };

    let out = match assemble_output(&job, &cfg.llm.model, llm_result) {
        Some(out) => out,
        None => {
            return dlq(queue, cfg, &raw, SummarizerReason::Unknown, "summary_empty_after_validation").await;
        }
    };

    let payload = match serde_json::to_value(&out) {
        Ok(v) => v,
        Err(e) => {
            return requeue(queue, cfg, &raw, &job, SummarizerReason::Unknown, &e.to_string()).await;
        }
    };

    // Head-push (LPUSH): consistent with the summariser/worker's
    // LPUSH-enqueue + BRPOP-pop FIFO pairing (spec.md §4.1 resolution).
    if let Err(e) = queue.push_head(&cfg.output_queue, &payload).await {
        return requeue(queue, cfg, &raw, &job, SummarizerReason::Unknown, &e.to_string()).await;
    }

    info!(
        trace_id = %job.trace_id,
        story_id = %job.story.id,
        article_id = %job.article.id,
        model = %cfg.llm.model,
        "summarizer.job.done"
    );
    Outcome::Done
}

/// Trims/caps the summary, normalises tags/topics, filters audience, clamps
/// numeric fields. Returns `None` if the summary is empty after validation
/// (spec.md invariant 6), which is a DLQ condition.
fn assemble_output(job: &SummarizerIn, model: &str, llm: LlmResult) -> Option<SummarizerOut> {
    let summary = validate::validate_summary(llm.summary.as_deref().unwrap_or(""))?;

    let classification = Classification {
        primary_category: llm.classification.primary_category,
        r#type: llm.classification.r#type,
        tags: validate::normalize_tags(&llm.classification.tags),
        topics: validate::normalize_tags(&llm.classification.topics),
    };

    let ui = UiLayer {
        summary_140: llm.ui.summary_140,
        quicktake: llm.ui.quicktake,
        audience: llm.ui.audience.map(|a| validate::filter_audience(&a)),
        impact_score: llm.ui.impact_score.map(validate::clamp_impact_score),
        confidence: llm.ui.confidence.map(validate::clamp_confidence),
        reading_time_min: llm.ui.reading_time_min,
        link_props: llm.ui.link_props.map(|lp| LinkProps {
            paywall: lp.paywall,
            format: lp.format,
            is_pdf: lp.is_pdf,
        }),
    };

    Some(SummarizerOut {
        trace_id: job.trace_id.clone(),
        story_id: job.story.id.clone(),
        article_id: job.article.id.clone(),
        model: model.to_string(),
        lang: job.article.language.clone(),
        summary,
        classification,
        ui,
        embedding: None,
        timestamps: Timestamps {
            summarized_at: Utc::now().to_rfc3339(),
        },
        schema_version: job.schema_version,
    })
}

async fn requeue(
    queue: &Queue,
    cfg: &SummarizerConfig,
    raw: &Value,
    job: &SummarizerIn,
    reason: SummarizerReason,
    err: &str,
) -> Outcome {
    let attempt = job.attempt + 1;
    if attempt >= cfg.max_retries {
        return dlq(queue, cfg, raw, reason, err).await;
    }

    let mut retry_job = job.clone();
    retry_job.attempt = attempt;
    let payload = serde_json::to_value(&retry_job).unwrap_or_else(|_| raw.clone());

    // Head-push, matching the original's LPUSH-based retry re-enqueue.
    if let Err(e) = queue.push_head(&cfg.retry_queue, &payload).await {
        warn!(error = %e, "summarizer.retry_enqueue.failed");
    }
    warn!(trace_id = %job.trace_id, attempt, reason = %reason, "summarizer.job.requeued");
    Outcome::Requeued
}

async fn dlq(queue: &Queue, cfg: &SummarizerConfig, payload: &Value, reason: SummarizerReason, err: &str) -> Outcome {
    let entry = envelope::dlq_entry(&reason.to_string(), err, "payload", payload.clone());
    if let Err(e) = queue.push_head(&cfg.dlq, &entry).await {
        warn!(error = %e, "summarizer.dlq_enqueue.failed");
    }
    warn!(reason = %reason, err, "summarizer.job.dlq");
    Outcome::Dlq(reason)
}

/// Pops from the retry queue first, then the input queue (original_source's
/// `read_job(r, [RETRY_QUEUE, INPUT_QUEUE])` order) via `BRPOP` — the
/// summariser/worker side of the pop-end split described in spec.md §4.1.
pub async fn pop_next(cfg: &SummarizerConfig, queue: &Queue) -> anyhow::Result<Option<Value>> {
    let queues = [cfg.retry_queue.as_str(), cfg.input_queue.as_str()];
    let Some((_, payload)) = queue.pop_blocking(&queues, Duration::from_secs(5), PopEnd::Tail).await? else {
        return Ok(None);
    };
    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_core::envelope::{ArticleForSummary, StoryRef, SummaryHints};

    fn base_job() -> SummarizerIn {
        SummarizerIn {
            trace_id: "t1".into(),
            story: StoryRef {
                id: "s1".into(),
                url: "https://example.com".into(),
                title: None,
                hn_id: None,
                source: None,
                created_at: None,
            },
            article: ArticleForSummary {
                id: "a1".into(),
                language: "en".into(),
                word_count: 10,
                is_pdf: false,
                is_paywalled: false,
                text_head: "head".into(),
                headings: vec![],
                text_tail: "tail".into(),
            },
            hints: SummaryHints::default(),
            metrics: None,
            attempt: 0,
            schema_version: 1,
        }
    }

    #[test]
    fn rejects_mismatched_schema_version() {
        let cfg = test_cfg();
        let mut job = base_job();
        job.schema_version = 2;
        assert!(validate_input(&cfg, &job).is_err());
    }

    #[test]
    fn rejects_language_outside_bounds() {
        let cfg = test_cfg();
        let mut job = base_job();
        job.article.language = "x".into();
        assert!(validate_input(&cfg, &job).is_err());
    }

    #[test]
    fn accepts_well_formed_job() {
        let cfg = test_cfg();
        assert!(validate_input(&cfg, &base_job()).is_ok());
    }

    fn test_cfg() -> SummarizerConfig {
        SummarizerConfig {
            redis_url: "redis://localhost".into(),
            input_queue: "summarizer:in".into(),
            output_queue: "summarizer:out".into(),
            retry_queue: "summarizer:retry".into(),
            dlq: "summarizer:dlq".into(),
            max_retries: 3,
            schema_version: 1,
            log_level: "info".into(),
            llm: crate::config::LlmConfig {
                model: "gpt-4o-mini".into(),
                api_key: "k".into(),
                base_url: None,
                temperature: 0.2,
                max_tokens: 800,
                timeout_s: 30,
            },
        }
    }
}
