//! Redis list-based FIFO queue primitives: typed push/blocking-pop, with
//! delayed-retry visibility and dead-letter routing left to the caller (the
//! queue layer itself is not time-aware, per spec.md §4.1).

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use tracing::debug;

use crate::envelope::decode_queue_item;
use crate::error::{CoreError, CoreResult};

/// Which end of the list `pop_blocking` drains from. The two services in
/// this pipeline disagree on this (see SPEC_FULL.md §4.1), so it is a
/// parameter rather than baked into `Queue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopEnd {
    Head,
    Tail,
}

#[derive(Clone)]
pub struct Queue {
    conn: ConnectionManager,
}

impl Queue {
    pub async fn connect(redis_url: &str) -> CoreResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    /// Pop from the first non-empty of `queues`, polled in the order given.
    /// A non-JSON payload decodes to `{"raw": <string>}` rather than
    /// erroring — the caller treats that as a poisoned message.
    pub async fn pop_blocking(
        &self,
        queues: &[&str],
        timeout: Duration,
        end: PopEnd,
    ) -> CoreResult<Option<(String, Value)>> {
        let mut conn = self.conn.clone();
        let timeout_secs = timeout.as_secs_f64().max(0.0);

        let result: Option<(String, Vec<u8>)> = match end {
            PopEnd::Head => conn.blpop(queues, timeout_secs).await?,
            PopEnd::Tail => conn.brpop(queues, timeout_secs).await?,
        };

        let Some((queue, raw)) = result else {
            debug!(queues = ?queues, "queue.pop.timeout");
            return Ok(None);
        };

        let payload = decode_queue_item(&raw);
        debug!(queue = %queue, "queue.pop.success");
        Ok(Some((queue, payload)))
    }

    pub async fn push_head(&self, queue: &str, payload: &Value) -> CoreResult<()> {
        let body = serde_json::to_string(payload)?;
        let mut conn = self.conn.clone();
        let _: i64 = conn.lpush(queue, body).await?;
        debug!(queue = %queue, "queue.push_head.success");
        Ok(())
    }

    pub async fn push_tail(&self, queue: &str, payload: &Value) -> CoreResult<()> {
        let body = serde_json::to_string(payload)?;
        let mut conn = self.conn.clone();
        let _: i64 = conn.rpush(queue, body).await?;
        debug!(queue = %queue, "queue.push_tail.success");
        Ok(())
    }

    /// Set-if-absent with expiry; `true` only on the first set. Shared
    /// primitive backing both the idempotency registry and scraper/summariser
    /// "done" markers.
    pub async fn mark_done(&self, key: &str, ttl: Duration) -> CoreResult<bool> {
        let mut conn = self.conn.clone();
        let set: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await?;
        Ok(set.is_some())
    }

    pub async fn exists(&self, key: &str) -> CoreResult<bool> {
        let mut conn = self.conn.clone();
        let n: i64 = conn.exists(key).await?;
        Ok(n > 0)
    }

    pub async fn ping(&self) -> CoreResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

/// Current epoch milliseconds, used for `visible_at` comparisons.
pub fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Exponential retry backoff with +0%..+25% jitter: `2^attempt * 1000 * U(1.0, 1.25)`.
/// Matches `main.py::_handle_retry`'s `delay_ms` formula exactly.
pub fn retry_backoff_ms(attempt: u32) -> i64 {
    use rand::Rng;
    let base = 2f64.powi(attempt as i32) * 1000.0;
    let jitter = rand::thread_rng().gen_range(1.0..=1.25);
    (base * jitter) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_falls_within_spec_bounds() {
        for attempt in 0..6 {
            for _ in 0..50 {
                let delay = retry_backoff_ms(attempt);
                let lower = 2f64.powi(attempt as i32) as i64 * 1000;
                let upper = 2f64.powi(attempt as i32) as i64 * 1250;
                assert!(
                    delay >= lower && delay <= upper,
                    "attempt={attempt} delay={delay} not in [{lower},{upper}]"
                );
            }
        }
    }
}
