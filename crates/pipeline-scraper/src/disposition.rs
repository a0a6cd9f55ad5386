//! Terminal job disposition: the exact string reason codes spec.md §7
//! requires on DLQ entries, and the retry-vs-DLQ decision.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScraperReason {
    BadPayload,
    NoUrl,
    UnsupportedMime,
    EmptyContent,
    FetchNonRetry,
    FetchRetry,
    FetchAllFailed,
    DbError,
    RedisOut,
}

impl fmt::Display for ScraperReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScraperReason::BadPayload => "bad_payload",
            ScraperReason::NoUrl => "no_url",
            ScraperReason::UnsupportedMime => "UNSUPPORTED_MIME",
            ScraperReason::EmptyContent => "EMPTY_CONTENT",
            ScraperReason::FetchNonRetry => "FETCH_NONRETRY",
            ScraperReason::FetchRetry => "FETCH_RETRY",
            ScraperReason::FetchAllFailed => "FETCH_ALL_FAILED",
            ScraperReason::DbError => "DB_ERROR",
            ScraperReason::RedisOut => "REDIS_OUT",
        };
        f.write_str(s)
    }
}

/// MIME check: content-type must contain "html", unless the URL itself ends
/// in ".html" (spec.md §4.9 DLQ trigger list).
pub fn is_supported_mime(content_type: &str, url: &str) -> bool {
    content_type.to_lowercase().contains("html") || url.to_lowercase().ends_with(".html")
}
