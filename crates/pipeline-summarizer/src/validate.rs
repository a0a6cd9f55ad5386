//! Output assembly & validation: summary trimming, tag/topic normalisation
//! with alias rewrites, audience whitelist, numeric clamps (spec.md §3, §4.7).

const MAX_SUMMARY_CHARS: usize = 800;
const MAX_TAGS: usize = 6;
const MIN_TAG_LEN: usize = 2;
const MAX_TAG_LEN: usize = 40;

/// Case-fold alias rewrites applied after normalisation.
const ALIASES: &[(&str, &str)] = &[("btrfs", "Btrfs")];

/// Closed controlled vocabulary for `ui.audience`, matching
/// `schemas.py::CONTROLLED_AUDIENCE` in the original source exactly.
const CONTROLLED_AUDIENCE: &[&str] = &[
    "Kernel Devs",
    "OSS Maintainers",
    "Data Scientists",
    "Frontend Engineers",
    "Backend Engineers",
    "Security Engineers",
];

/// Trims and truncates to 800 chars; returns `None` if the result is empty
/// (spec.md invariant 6).
pub fn validate_summary(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let truncated: String = trimmed.chars().take(MAX_SUMMARY_CHARS).collect();
    Some(truncated)
}

/// Normalises a tag/topic list: take the first 6 entries, then trim, length
/// filter 2..40, and case-fold alias rewrite (spec.md invariant 7). The
/// slice-then-filter order matches `normalizers.py`'s `(tags or [])[:6]`, so
/// invalid entries among the first 6 are dropped rather than backfilled from
/// further down the list.
pub fn normalize_tags(raw: &[String]) -> Vec<String> {
    raw.iter()
        .take(MAX_TAGS)
        .map(|t| t.trim().to_string())
        .filter(|t| t.chars().count() >= MIN_TAG_LEN && t.chars().count() <= MAX_TAG_LEN)
        .map(apply_alias)
        .collect()
}

fn apply_alias(tag: String) -> String {
    for (from, to) in ALIASES {
        if tag.eq_ignore_ascii_case(from) {
            return (*to).to_string();
        }
    }
    tag
}

/// Retains only audience values in the closed controlled vocabulary.
pub fn filter_audience(raw: &[String]) -> Vec<String> {
    raw.iter()
        .filter(|v| CONTROLLED_AUDIENCE.contains(&v.as_str()))
        .cloned()
        .collect()
}

pub fn clamp_impact_score(v: f64) -> i32 {
    v.clamp(0.0, 100.0).round() as i32
}

pub fn clamp_confidence(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_is_trimmed_and_capped() {
        let raw = format!("  {}  ", "x".repeat(900));
        let v = validate_summary(&raw).unwrap();
        assert_eq!(v.chars().count(), MAX_SUMMARY_CHARS);
    }

    #[test]
    fn empty_summary_is_rejected() {
        assert!(validate_summary("   ").is_none());
    }

    #[test]
    fn tags_apply_alias_case_fold() {
        let tags = normalize_tags(&["BTRFS".to_string(), "rust".to_string()]);
        assert_eq!(tags, vec!["Btrfs".to_string(), "rust".to_string()]);
    }

    #[test]
    fn tags_are_sliced_to_six_before_length_filtering() {
        let input: Vec<String> = vec![
            "a".to_string(), // too short, within the first 6 -> dropped, not backfilled
            "x".repeat(41),  // too long, within the first 6 -> dropped, not backfilled
            "ok1".to_string(),
            "ok2".to_string(),
            "ok3".to_string(),
            "ok4".to_string(),
            "ok5".to_string(), // beyond the first 6, never considered
            "ok6".to_string(),
        ];
        let tags = normalize_tags(&input);
        assert_eq!(tags, vec!["ok1", "ok2", "ok3", "ok4"]);
    }

    #[test]
    fn audience_filter_drops_unknown_values() {
        let out = filter_audience(&["Kernel Devs".to_string(), "Martians".to_string()]);
        assert_eq!(out, vec!["Kernel Devs".to_string()]);
    }

    #[test]
    fn numeric_clamps_bound_to_spec_ranges() {
        assert_eq!(clamp_impact_score(150.0), 100);
        assert_eq!(clamp_impact_score(-10.0), 0);
        assert_eq!(clamp_confidence(1.5), 1.0);
        assert_eq!(clamp_confidence(-0.2), 0.0);
    }
}
