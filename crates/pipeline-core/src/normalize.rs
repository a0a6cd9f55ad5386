//! URL canonicalisation, language detection, content hashing, reading time.
//! Pure functions, shared by scraper and summariser.

use sha2::{Digest, Sha256};
use url::Url;

/// Closed set of tracking query parameters dropped during canonicalisation.
/// Matches `normalize.py::TRACKING_PARAMS` exactly.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_cid",
    "mc_eid",
];

/// Parse, drop tracking query parameters (case-insensitive key match) and
/// the fragment, and preserve everything else byte-for-byte. Returns the
/// canonical URL and its registrable domain (`domain.suffix`).
pub fn canonicalize_url(raw: &str) -> Result<(String, String), url::ParseError> {
    let mut url = Url::parse(raw)?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.iter().any(|t| t.eq_ignore_ascii_case(k)))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        let qs = kept
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding_encode(k), urlencoding_encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&qs));
    }
    url.set_fragment(None);

    let domain = registrable_domain(url.host_str().unwrap_or_default());
    Ok((url.to_string(), domain))
}

/// Registrable domain (`domain.suffix`) via the public suffix list, mirroring
/// `tldextract.extract(...)`.
pub fn registrable_domain(host: &str) -> String {
    match addr::parse_domain_name(host) {
        Ok(name) => name.root().map(str::to_string).unwrap_or_else(|| host.to_string()),
        Err(_) => host.to_string(),
    }
}

fn urlencoding_encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Library-based language classification; empty input or an allow-list miss
/// returns `"und"`, matching `normalize.py::detect_language`.
pub fn detect_language(text: &str, allowed_csv: Option<&str>) -> String {
    if text.trim().is_empty() {
        return "und".to_string();
    }
    let Some(info) = whatlang::detect(text) else {
        return "und".to_string();
    };
    let lang = info.lang().code().to_string();

    if let Some(csv) = allowed_csv {
        let allowed: Vec<&str> = csv.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
        if !allowed.is_empty() && !allowed.contains(&lang.as_str()) {
            return "und".to_string();
        }
    }
    lang
}

/// `clamp(ceil(words/200), 1, 60)` minutes.
pub fn reading_time_min(words: usize) -> u32 {
    let minutes = ((words as f64) / 200.0).ceil() as i64;
    minutes.clamp(1, 60) as u32
}

/// `SHA256(language || "\n" || domain || "\n" || text[:10_000])`.
pub fn content_hash(language: &str, domain: &str, text: &str) -> String {
    let truncated: String = text.chars().take(10_000).collect();
    let base = format!("{language}\n{domain}\n{truncated}");
    let mut hasher = Sha256::new();
    hasher.update(base.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_drops_tracking_params_and_fragment() {
        let (canon, domain) = canonicalize_url(
            "https://example.com/a?utm_source=x&id=7&utm_campaign=y#section",
        )
        .unwrap();
        assert_eq!(canon, "https://example.com/a?id=7");
        assert_eq!(domain, "example.com");
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let (once, _) = canonicalize_url("https://example.com/a?utm_source=x&id=7").unwrap();
        let (twice, _) = canonicalize_url(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn canonicalize_preserves_non_tracking_params_byte_for_byte() {
        let (canon, _) = canonicalize_url("https://example.com/a?z=1&a=2&id=7").unwrap();
        assert_eq!(canon, "https://example.com/a?z=1&a=2&id=7");
    }

    #[test]
    fn reading_time_bounds() {
        assert_eq!(reading_time_min(0), 1);
        assert_eq!(reading_time_min(200), 1);
        assert_eq!(reading_time_min(201), 2);
        assert_eq!(reading_time_min(1_000_000), 60);
    }

    #[test]
    fn content_hash_depends_only_on_first_10k_chars() {
        let long_tail = "x".repeat(20_000);
        let a = content_hash("en", "example.com", &format!("head{long_tail}"));
        let b = content_hash("en", "example.com", &format!("head{}", "x".repeat(9_996)));
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_changes_with_domain() {
        let a = content_hash("en", "example.com", "hello world");
        let b = content_hash("en", "other.com", "hello world");
        assert_ne!(a, b);
    }

    #[test]
    fn empty_text_detects_as_und() {
        assert_eq!(detect_language("", None), "und");
    }
}
