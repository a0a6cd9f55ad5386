//! HTTP(S) fetch with a realistic browser-like header set, and an optional
//! headless-browser fallback for rendering-dependent or lightly-blocked
//! pages (spec.md §4.3).

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, warn};

/// Status codes treated as transient: real 5xx plus the edge-block/rate-limit
/// set called out in spec.md §4.3.
const RETRYABLE_STATUSES: &[u16] = &[401, 403, 406, 408, 409, 412, 429, 451];

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("retryable fetch failure: {0}")]
    Retryable(String),
    #[error("non-retryable fetch failure: {0}")]
    NonRetryable(String),
}

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub final_url: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

pub struct Fetcher {
    client: reqwest::Client,
    user_agent: Option<String>,
    ua_counter: std::sync::atomic::AtomicUsize,
}

impl Fetcher {
    pub fn new(timeout: Duration, user_agent: Option<String>, proxy: Option<String>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .use_rustls_tls()
            .http2_adaptive_window(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .gzip(true)
            .brotli(true);
        if let Some(proxy_url) = &proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }
        Ok(Self {
            client: builder.build()?,
            user_agent,
            ua_counter: std::sync::atomic::AtomicUsize::new(0),
        })
    }

    fn pick_user_agent(&self) -> &str {
        if let Some(ua) = &self.user_agent {
            return ua;
        }
        let idx = self
            .ua_counter
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            % USER_AGENTS.len();
        USER_AGENTS[idx]
    }

    /// Direct HTTP GET with a realistic browser-like header set. Classifies
    /// the outcome into `Retryable`/`NonRetryable` per spec.md §4.3.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", self.pick_user_agent())
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Accept-Encoding", "gzip, deflate, br")
            .header("Upgrade-Insecure-Requests", "1")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none")
            .header("Sec-Fetch-User", "?1")
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if status.is_success() {
            let body = response
                .bytes()
                .await
                .map_err(|e| FetchError::Retryable(e.to_string()))?
                .to_vec();
            debug!(url = %final_url, status = status.as_u16(), "fetcher.direct.success");
            return Ok(FetchResult {
                final_url,
                content_type,
                body,
            });
        }

        classify_status(status)
    }
}

/// Timeouts and connection/request-send failures are transient; a malformed
/// request (bad URL/headers) or a body-decode failure will fail the same way
/// on every retry.
fn classify_transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        FetchError::Retryable(err.to_string())
    } else {
        FetchError::NonRetryable(err.to_string())
    }
}

fn classify_status<T>(status: StatusCode) -> Result<T, FetchError> {
    let code = status.as_u16();
    if status.is_server_error() || RETRYABLE_STATUSES.contains(&code) {
        Err(FetchError::Retryable(format!("http {code}")))
    } else {
        Err(FetchError::NonRetryable(format!("http {code}")))
    }
}

/// Headless-browser fallback. Blocks image/media/font subresources, disables
/// `navigator.webdriver`, performs a short paced scroll, and returns the
/// rendered HTML. Runs on a blocking thread since `headless_chrome`'s API is
/// synchronous (spec.md §9 "pick one concurrency idiom and commit" — the
/// caller-facing surface stays `async fn`).
///
/// Returns `Ok(None)` on any headless failure ("no result", not an
/// exception) so the caller can decide retry vs. DLQ, per spec.md §4.3.
pub async fn headless_fetch(
    url: &str,
    timeout: Duration,
) -> anyhow::Result<Option<FetchResult>> {
    let url = url.to_string();
    let result = tokio::task::spawn_blocking(move || headless_fetch_blocking(&url, timeout)).await?;
    match result {
        Ok(r) => Ok(Some(r)),
        Err(e) => {
            warn!(error = %e, "fetcher.headless.failed");
            Ok(None)
        }
    }
}

fn headless_fetch_blocking(url: &str, timeout: Duration) -> anyhow::Result<FetchResult> {
    use headless_chrome::{Browser, LaunchOptions};

    let options = LaunchOptions::default_builder()
        .headless(true)
        .idle_browser_timeout(timeout)
        .build()?;
    // `Browser`/`Tab` close their underlying Chrome process on `Drop`, so
    // every exit path (including the `?` early-returns below) releases the
    // browser, context, and page without a manual three-step teardown.
    let browser = Browser::new(options)?;
    let tab = browser.new_tab()?;

    // Block image/media/font subresources so the page loads faster and we
    // don't waste bandwidth on assets the extractor never reads.
    tab.enable_request_interception(std::sync::Arc::new(|_transport, _id, request| {
        if matches!(request.resource_type.as_str(), "Image" | "Media" | "Font") {
            headless_chrome::browser::tab::RequestPausedDecision::Fail(
                headless_chrome::protocol::cdp::Network::ErrorReason::BlockedByClient,
            )
        } else {
            headless_chrome::browser::tab::RequestPausedDecision::Continue(None)
        }
    }))?;

    tab.navigate_to(url)?;
    tab.wait_until_navigated()?;

    // Minimal anti-automation tweak.
    let _ = tab.evaluate(
        "Object.defineProperty(navigator, 'webdriver', {get: () => undefined})",
        false,
    );

    // Paced scroll: ~2400px total in 250ms steps.
    for _ in 0..8 {
        let _ = tab.evaluate("window.scrollBy(0, 300)", false);
        std::thread::sleep(Duration::from_millis(250));
    }

    let html = tab.get_content()?;
    let final_url = tab.get_url();

    Ok(FetchResult {
        final_url,
        content_type: "text/html".to_string(),
        body: html.into_bytes(),
    })
}
