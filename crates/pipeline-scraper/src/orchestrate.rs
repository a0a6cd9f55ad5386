//! Scraper orchestration: received → validated → (skip|normalised →
//! fetched → extracted → persisted → emitted → done). Terminal states:
//! done, requeued, dlq (spec.md §4.9).

use std::time::Duration;

use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::{info, warn};

use pipeline_core::envelope::{self, ArticleForSummary, IngestJob, StoryRef, SummarizerIn, SummaryHints};
use pipeline_core::idempotency;
use pipeline_core::normalize::{canonicalize_url, content_hash, detect_language};
use pipeline_core::queue::{now_ms, retry_backoff_ms, PopEnd, Queue};

use crate::config::ScraperConfig;
use crate::disposition::{is_supported_mime, ScraperReason};
use crate::extractor::{self, Extracted};
use crate::fetcher::{self, FetchError, FetchResult, Fetcher};
use crate::payloads;
use crate::store::{self, NewArticle};

pub enum Outcome {
    Done,
    Skipped,
    Requeued,
    Dlq(ScraperReason),
}

/// Drives a single job through the full pipeline and returns its terminal
/// outcome. Retry/DLQ routing, idempotency marking, and downstream
/// enqueueing all happen inside this function so `main`'s loop only needs
/// to log the result.
pub async fn process_job(
    cfg: &ScraperConfig,
    queue: &Queue,
    pool: &PgPool,
    fetcher: &Fetcher,
    raw: Value,
) -> Outcome {
    let job: IngestJob = match serde_json::from_value(raw.clone()) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "scraper.payload.invalid");
            return dlq(queue, cfg, &raw, ScraperReason::BadPayload, &e.to_string()).await;
        }
    };

    if job.story.url.trim().is_empty() {
        return dlq(queue, cfg, &raw, ScraperReason::NoUrl, "story.url is empty").await;
    }

    let done_key = idempotency::scraper_done_key(&job.story.id);
    if !cfg.force {
        match idempotency::check(queue, &done_key).await {
            Ok(true) => {
                info!(story_id = %job.story.id, "scraper.idempotent.skip");
                return Outcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "scraper.idempotency_check.failed");
                return requeue(queue, cfg, &job, ScraperReason::RedisOut, &e.to_string()).await;
            }
        }
    } else {
        warn!(story_id = %job.story.id, "scraper.force.idempotency_skip_bypassed");
    }

    let (canonical_url, domain) = match canonicalize_url(&job.story.url) {
        Ok(v) => v,
        Err(e) => {
            return dlq(queue, cfg, &raw, ScraperReason::BadPayload, &e.to_string()).await;
        }
    };

    let fetch_outcome = fetch_with_fallback(cfg, fetcher, &canonical_url).await;
    let (fetched, used_headless) = match fetch_outcome {
        Ok(v) => v,
        Err(FetchOutcomeError::NonRetryable(reason)) => {
            return dlq(queue, cfg, &raw, ScraperReason::FetchNonRetry, &reason).await;
        }
        Err(FetchOutcomeError::Retryable(reason)) => {
            return requeue(queue, cfg, &job, ScraperReason::FetchRetry, &reason).await;
        }
    };

    if !is_supported_mime(&fetched.content_type, &fetched.final_url) {
        return dlq(
            queue,
            cfg,
            &raw,
            ScraperReason::UnsupportedMime,
            &fetched.content_type,
        )
        .await;
    }

    let html = String::from_utf8_lossy(&fetched.body).to_string();
    let mut extracted = extractor::extract(&html, &fetched.final_url);

    // Empty extraction and headless not yet used: retry once against the
    // final URL via headless, then re-extract.
    if extracted.text.trim().is_empty() && !used_headless && cfg.headless_enabled {
        match fetcher::headless_fetch(&fetched.final_url, cfg.headless_timeout).await {
            Ok(Some(rendered)) => {
                let html = String::from_utf8_lossy(&rendered.body).to_string();
                extracted = extractor::extract(&html, &rendered.final_url);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "scraper.headless_retry.failed"),
        }
    }

    if extracted.text.trim().is_empty() {
        return dlq(queue, cfg, &raw, ScraperReason::EmptyContent, "empty after fallback").await;
    }

    let language = detect_language(&extracted.text, cfg.allowed_langs.as_deref());
    let hash = content_hash(&language, &domain, &extracted.text);
    let word_count = extracted.text.split_whitespace().count();
    let paywalled = payloads::is_paywalled(word_count, &html);

    let article = NewArticle {
        language: &language,
        html: Some(&html),
        text: &extracted.text,
        word_count: word_count as i32,
        content_hash: &hash,
    };

    let article_id = match store::upsert_article_and_link(
        pool,
        &job.story.id,
        article,
        Some(&domain),
        extracted.author.as_deref(),
    )
    .await
    {
        Ok(id) => id,
        Err(e) => {
            return requeue(queue, cfg, &job, ScraperReason::DbError, &e.to_string()).await;
        }
    };

    let url_path = url::Url::parse(&fetched.final_url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| "/".to_string());

    let summarizer_in = SummarizerIn {
        trace_id: job.trace_id.clone(),
        story: job.story.clone(),
        article: ArticleForSummary {
            id: article_id.to_string(),
            language,
            word_count,
            is_pdf: fetched.content_type.contains("pdf"),
            is_paywalled: paywalled,
            text_head: payloads::first_paragraphs(&extracted.text, 900),
            headings: extracted.headings.clone(),
            text_tail: payloads::last_paragraphs(&extracted.text, 600),
        },
        hints: SummaryHints {
            candidate_tags: payloads::candidate_tags_from(
                job.story.title.as_deref().unwrap_or(""),
                &extracted.headings,
                &url_path,
            ),
            source_reputation: 0.5,
        },
        metrics: None,
        attempt: 0,
        schema_version: envelope::SCHEMA_VERSION,
    };

    let payload = match serde_json::to_value(&summarizer_in) {
        Ok(v) => v,
        Err(e) => {
            return requeue(queue, cfg, &job, ScraperReason::RedisOut, &e.to_string()).await;
        }
    };

    // Head-push: newest-first priority to the summariser (spec.md §4.1).
    if let Err(e) = queue.push_head(&cfg.summarizer_queue, &payload).await {
        return requeue(queue, cfg, &job, ScraperReason::RedisOut, &e.to_string()).await;
    }

    if let Err(e) = queue.mark_done(&done_key, idempotency::DEFAULT_TTL).await {
        warn!(error = %e, "scraper.done_marker.failed");
    }

    info!(
        story_id = %job.story.id,
        article_id = %article_id,
        used_headless,
        "scraper.job.done"
    );

    if !cfg.post_scrape_delay.is_zero() {
        tokio::time::sleep(cfg.post_scrape_delay).await;
    }

    Outcome::Done
}

enum FetchOutcomeError {
    Retryable(String),
    NonRetryable(String),
}

/// Direct fetch, falling back to headless once on a retryable failure.
async fn fetch_with_fallback(
    cfg: &ScraperConfig,
    fetcher: &Fetcher,
    url: &str,
) -> Result<(FetchResult, bool), FetchOutcomeError> {
    match fetcher.fetch(url).await {
        Ok(result) => Ok((result, false)),
        Err(FetchError::NonRetryable(reason)) => Err(FetchOutcomeError::NonRetryable(reason)),
        Err(FetchError::Retryable(reason)) => {
            if !cfg.headless_enabled {
                return Err(FetchOutcomeError::Retryable(reason));
            }
            match fetcher::headless_fetch(url, cfg.headless_timeout).await {
                Ok(Some(result)) => Ok((result, true)),
                Ok(None) => Err(FetchOutcomeError::Retryable(reason)),
                Err(e) => Err(FetchOutcomeError::Retryable(e.to_string())),
            }
        }
    }
}

async fn requeue(
    queue: &Queue,
    cfg: &ScraperConfig,
    job: &IngestJob,
    reason: ScraperReason,
    err: &str,
) -> Outcome {
    let attempt = job.attempt + 1;
    if attempt > cfg.max_retries {
        let raw = serde_json::to_value(job).unwrap_or_else(|_| json!({"story_id": job.story.id}));
        return dlq(queue, cfg, &raw, reason, err).await;
    }

    let delay = retry_backoff_ms(attempt);
    let retry_job = IngestJob {
        trace_id: job.trace_id.clone(),
        story: job.story.clone(),
        attempt,
        visible_at: Some(now_ms() + delay),
    };
    let payload = serde_json::to_value(&retry_job).unwrap_or_default();

    if let Err(e) = queue.push_tail(&cfg.retry_queue, &payload).await {
        warn!(error = %e, "scraper.retry_enqueue.failed");
    }
    info!(story_id = %job.story.id, attempt, delay_ms = delay, reason = %reason, "scraper.job.requeued");
    Outcome::Requeued
}

async fn dlq(queue: &Queue, cfg: &ScraperConfig, payload: &Value, reason: ScraperReason, err: &str) -> Outcome {
    let entry = envelope::dlq_entry(&reason.to_string(), err, "job", payload.clone());
    if let Err(e) = queue.push_tail(&cfg.dlq, &entry).await {
        warn!(error = %e, "scraper.dlq_enqueue.failed");
    }
    warn!(reason = %reason, err, "scraper.job.dlq");
    Outcome::Dlq(reason)
}

/// Pops the next job from the input queue or the retry queue, honouring
/// `visible_at`: if the popped retry-job isn't visible yet, it is re-pushed
/// to the tail of the same retry queue and treated as a miss (spec.md
/// §4.1's busy-churn delayed-retry scheme).
pub async fn pop_next(cfg: &ScraperConfig, queue: &Queue) -> anyhow::Result<Option<Value>> {
    let queues = [cfg.input_queue.as_str(), cfg.retry_queue.as_str()];
    // BLPOP: the scraper pops from the head (original_source's `BLPOP`
    // choice, per SPEC_FULL.md §4.1's resolution of the pop-end ambiguity).
    let Some((popped_queue, payload)) = queue.pop_blocking(&queues, Duration::from_secs(5), PopEnd::Head).await? else {
        return Ok(None);
    };

    if popped_queue == cfg.retry_queue {
        if let Some(visible_at) = payload.get("visible_at").and_then(Value::as_i64) {
            if visible_at > now_ms() {
                queue.push_tail(&cfg.retry_queue, &payload).await?;
                return Ok(None);
            }
        }
    }

    Ok(Some(payload))
}
