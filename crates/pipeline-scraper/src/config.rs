//! Scraper configuration, read once at startup (spec.md §6).

use std::time::Duration;

use pipeline_core::config::{bool_with_default, optional, parsed_with_default, pg_dsn, with_default};

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub redis_url: String,
    pub pg_dsn: String,
    pub input_queue: String,
    pub summarizer_queue: String,
    pub retry_queue: String,
    pub dlq: String,
    pub fetch_timeout: Duration,
    pub headless_enabled: bool,
    pub headless_timeout: Duration,
    pub user_agent: Option<String>,
    pub max_retries: u32,
    pub allowed_langs: Option<String>,
    pub post_scrape_delay: Duration,
    pub force: bool,
    pub log_level: String,
    pub proxy: Option<String>,
}

impl ScraperConfig {
    pub fn load() -> Result<Self, &'static str> {
        let fetch_timeout_ms = parsed_with_default("FETCH_TIMEOUT_MS", 15_000u64).max(1_000);
        let headless_timeout_ms = parsed_with_default("HEADLESS_TIMEOUT_MS", 20_000u64);
        Ok(Self {
            redis_url: pipeline_core::config::required("REDIS_URL")?,
            pg_dsn: pg_dsn()?,
            input_queue: with_default("INPUT_QUEUE", "ingest:out"),
            summarizer_queue: with_default("SUMMARIZER_QUEUE", "summarizer:in"),
            retry_queue: with_default("RETRY_QUEUE", "scraper:retry"),
            dlq: with_default("DLQ", "scraper:dlq"),
            fetch_timeout: Duration::from_millis(fetch_timeout_ms),
            headless_enabled: bool_with_default("HEADLESS_ENABLED", true),
            headless_timeout: Duration::from_millis(headless_timeout_ms),
            user_agent: optional("USER_AGENT"),
            max_retries: parsed_with_default("MAX_RETRIES", 2u32),
            allowed_langs: optional("ALLOWED_LANGS"),
            post_scrape_delay: Duration::from_secs(parsed_with_default(
                "POST_SCRAPE_DELAY_SECONDS",
                10u64,
            )),
            force: bool_with_default("FORCE", false),
            log_level: with_default("LOG_LEVEL", "debug"),
            proxy: optional("HTTP_PROXY"),
        })
    }
}
