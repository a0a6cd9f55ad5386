//! Dispatcher configuration, read once at startup (spec.md §6).

use pipeline_core::config::{parsed_with_default, pg_dsn, with_default};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub redis_url: String,
    pub pg_dsn: String,
    pub max_retries: u32,
    pub log_level: String,
    /// Bare queue names, polled in this declared order (spec.md §4.8).
    pub queues: [&'static str; 5],
    pub fetch_timeout_ms: u64,
}

pub const QUEUE_FETCH_ARTICLE: &str = "FETCH_ARTICLE";
pub const QUEUE_SUMMARIZE: &str = "SUMMARIZE";
pub const QUEUE_EMBED: &str = "EMBED";
pub const QUEUE_TAG: &str = "TAG";
pub const QUEUE_REFRESH_HN_STATS: &str = "REFRESH_HN_STATS";

impl WorkerConfig {
    pub fn load() -> Result<Self, &'static str> {
        Ok(Self {
            redis_url: pipeline_core::config::required("REDIS_URL")?,
            pg_dsn: pg_dsn()?,
            max_retries: parsed_with_default("MAX_RETRIES", 5u32),
            log_level: with_default("LOG_LEVEL", "info"),
            queues: [
                QUEUE_FETCH_ARTICLE,
                QUEUE_SUMMARIZE,
                QUEUE_EMBED,
                QUEUE_TAG,
                QUEUE_REFRESH_HN_STATS,
            ],
            fetch_timeout_ms: parsed_with_default("FETCH_TIMEOUT_MS", 20_000u64),
        })
    }

    pub fn dlq_for(&self, queue_name: &str) -> String {
        format!("DLQ:{queue_name}")
    }
}
