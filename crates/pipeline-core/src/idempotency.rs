//! Set-once completion markers with TTL (spec.md §4.2). `claim` grants
//! exclusive processing rights; `check` is a plain existence test. The
//! asymmetry between the scraper (advisory `check`) and summariser
//! (authoritative `claim`) lives in each binary, not here.

use std::time::Duration;

use crate::error::CoreResult;
use crate::queue::Queue;

pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Atomic set-if-absent. Returns `true` only if this call performed the set
/// (i.e. the caller now holds exclusive processing rights for `ttl`).
pub async fn claim(queue: &Queue, key: &str, ttl: Duration) -> CoreResult<bool> {
    queue.mark_done(key, ttl).await
}

/// Plain existence check, used by the scraper before work begins.
pub async fn check(queue: &Queue, key: &str) -> CoreResult<bool> {
    queue.exists(key).await
}

pub fn scraper_done_key(story_id: &str) -> String {
    format!("scraper:done:{story_id}")
}

pub fn summarizer_done_key(article_id: &str, model: &str) -> String {
    format!("summarizer:done:{article_id}:{model}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_formats_match_spec() {
        assert_eq!(scraper_done_key("s1"), "scraper:done:s1");
        assert_eq!(
            summarizer_done_key("a1", "gpt-4o-mini"),
            "summarizer:done:a1:gpt-4o-mini"
        );
    }
}
