//! Generic multi-queue dispatcher: fixed `TaskKind → handler` mapping,
//! per-task retry/DLQ, and follow-on enqueue after `FETCH_ARTICLE` (spec.md
//! §4.8), ported from `worker-py/app/worker.py::Worker`.

use std::time::Duration;

use serde_json::{json, Value};
use sqlx::PgPool;
use tracing::{info, warn};

use pipeline_core::queue::{PopEnd, Queue};

use crate::config::{
    WorkerConfig, QUEUE_EMBED, QUEUE_FETCH_ARTICLE, QUEUE_REFRESH_HN_STATS, QUEUE_SUMMARIZE,
    QUEUE_TAG,
};
use crate::tasks;

pub enum Outcome {
    Done,
    Requeued,
    Dlq,
    UnknownQueue,
}

/// Pops the next job across all five queues (declared order), runs its
/// handler, and resolves retry/DLQ/follow-on enqueue. One call processes at
/// most one job; `Ok(None)` on a bare poll timeout.
pub async fn run_once(
    cfg: &WorkerConfig,
    queue: &Queue,
    pool: &PgPool,
    fetch_timeout: Duration,
) -> anyhow::Result<Option<Outcome>> {
    // BLPOP: the dispatcher pops from the head, matching `worker-py/app/queue.py`'s
    // own `blpop` (distinct from the summariser's tail-pop — see SPEC_FULL.md §4.1).
    let Some((queue_name, payload)) = queue
        .pop_blocking(&cfg.queues, Duration::from_secs(5), PopEnd::Head)
        .await?
    else {
        return Ok(None);
    };

    let attempt = payload.get("attempt").and_then(Value::as_u64).unwrap_or(1);

    let handled = dispatch(&queue_name, pool, fetch_timeout, &payload).await;

    match handled {
        Ok(result) => {
            if queue_name == QUEUE_FETCH_ARTICLE {
                enqueue_follow_ons(queue, &payload, &result).await;
            }
            info!(queue = %queue_name, "worker.task.ok");
            Ok(Some(Outcome::Done))
        }
        Err(None) => {
            warn!(queue = %queue_name, "worker.task.unknown_queue");
            Ok(Some(Outcome::UnknownQueue))
        }
        Err(Some(err)) => {
            if attempt >= cfg.max_retries as u64 {
                let entry = build_dlq_entry(&payload, &err);
                let dlq_name = cfg.dlq_for(&queue_name);
                if let Err(e) = queue.push_head(&dlq_name, &entry).await {
                    warn!(error = %e, queue = %queue_name, "worker.dlq_enqueue.failed");
                }
                warn!(queue = %queue_name, attempt, error = %err, "worker.task.dlq");
                Ok(Some(Outcome::Dlq))
            } else {
                let mut retry_payload = payload.clone();
                if let Value::Object(ref mut map) = retry_payload {
                    map.insert("attempt".to_string(), json!(attempt + 1));
                }
                if let Err(e) = queue.push_head(&queue_name, &retry_payload).await {
                    warn!(error = %e, queue = %queue_name, "worker.retry_enqueue.failed");
                }
                warn!(queue = %queue_name, attempt = attempt + 1, error = %err, "worker.task.requeued");
                Ok(Some(Outcome::Requeued))
            }
        }
    }
}

/// `Err(None)` signals an unknown queue name (logged + discarded, no
/// requeue); `Err(Some(msg))` is any handler failure.
async fn dispatch(
    queue_name: &str,
    pool: &PgPool,
    fetch_timeout: Duration,
    payload: &Value,
) -> Result<Value, Option<String>> {
    let result = match queue_name {
        QUEUE_FETCH_ARTICLE => tasks::handle_fetch_article(pool, fetch_timeout, payload).await,
        QUEUE_SUMMARIZE => tasks::handle_summarize(pool, payload).await,
        QUEUE_EMBED => tasks::handle_embed(pool, payload).await,
        QUEUE_TAG => tasks::handle_tag(pool, payload).await,
        QUEUE_REFRESH_HN_STATS => tasks::handle_refresh_hn_stats(pool, payload).await,
        _ => return Err(None),
    };
    result.map_err(|e| Some(e.to_string()))
}

/// `FETCH_ARTICLE` success enqueues `SUMMARIZE`/`EMBED` (if `article_id`
/// present) and `TAG` (if `story_id` present) — each independently guarded,
/// fixing the original's unconditional enqueue (spec.md §9 note 3).
async fn enqueue_follow_ons(queue: &Queue, job: &Value, result: &Value) {
    for (queue_name, follow_on) in follow_on_jobs(job, result) {
        if let Err(e) = queue.push_head(queue_name, &follow_on).await {
            warn!(error = %e, queue = %queue_name, "worker.follow_on.enqueue_failed");
        }
    }
}

/// Builds the guarded follow-on jobs: `SUMMARIZE`/`EMBED` only when
/// `article_id` is present in `result`, `TAG` only when `story_id` is
/// present in the original `job`.
fn follow_on_jobs(job: &Value, result: &Value) -> Vec<(&'static str, Value)> {
    let mut jobs = Vec::new();

    if let Some(article_id) = result.get("article_id").and_then(Value::as_str) {
        jobs.push((
            QUEUE_SUMMARIZE,
            json!({ "article_id": article_id, "attempt": 1 }),
        ));
        jobs.push((
            QUEUE_EMBED,
            json!({ "article_id": article_id, "model_key": "default", "attempt": 1 }),
        ));
    }

    if let Some(story_id) = job.get("story_id").and_then(Value::as_str) {
        jobs.push((
            QUEUE_TAG,
            json!({
                "story_id": story_id,
                "title": job.get("title").cloned().unwrap_or(Value::Null),
                "attempt": 1,
            }),
        ));
    }

    jobs
}

fn build_dlq_entry(payload: &Value, err: &str) -> Value {
    let mut entry = payload.clone();
    if let Value::Object(ref mut map) = entry {
        map.insert("error".to_string(), json!(err));
        map.insert("failed_at".to_string(), json!(pipeline_core::queue::now_ms() / 1000));
    }
    entry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_summarize_and_embed_on_article_id() {
        let job = json!({ "story_id": "s1" });
        let result = json!({ "article_id": "a1" });
        let jobs = follow_on_jobs(&job, &result);
        let queues: Vec<&str> = jobs.iter().map(|(q, _)| *q).collect();
        assert!(queues.contains(&QUEUE_SUMMARIZE));
        assert!(queues.contains(&QUEUE_EMBED));
        assert!(queues.contains(&QUEUE_TAG));
    }

    #[test]
    fn skips_summarize_and_embed_without_article_id() {
        let job = json!({ "story_id": "s1" });
        let result = json!({});
        let jobs = follow_on_jobs(&job, &result);
        let queues: Vec<&str> = jobs.iter().map(|(q, _)| *q).collect();
        assert!(!queues.contains(&QUEUE_SUMMARIZE));
        assert!(!queues.contains(&QUEUE_EMBED));
        assert!(queues.contains(&QUEUE_TAG));
    }

    #[test]
    fn skips_tag_without_story_id() {
        let job = json!({});
        let result = json!({ "article_id": "a1" });
        let jobs = follow_on_jobs(&job, &result);
        let queues: Vec<&str> = jobs.iter().map(|(q, _)| *q).collect();
        assert!(queues.contains(&QUEUE_SUMMARIZE));
        assert!(!queues.contains(&QUEUE_TAG));
    }

    #[test]
    fn no_follow_ons_when_both_ids_missing() {
        let jobs = follow_on_jobs(&json!({}), &json!({}));
        assert!(jobs.is_empty());
    }
}
