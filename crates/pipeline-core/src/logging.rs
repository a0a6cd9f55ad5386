//! One JSON object per line on stdout, with recursive secret redaction.
//!
//! The original services each hand-roll a `JsonLogger` (`scraper-py/app/logging.py`)
//! that never lets a logging failure crash the worker and scrubs sensitive
//! keys before the object is serialized. Here the same contract is built as
//! a `tracing_subscriber::Layer`, so call sites use ordinary `tracing::info!`
//! / `tracing::warn!` macros (the ambient idiom the rest of the pack uses)
//! while still getting the exact field-redaction and fallback-emission
//! behavior the spec requires.

use std::io::Write;
use std::process;

use serde_json::{json, Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::EnvFilter;

const REDACT_KEYS: &[&str] = &[
    "api_key",
    "authorization",
    "password",
    "secret",
    "token",
    "access_token",
    "refresh_token",
];

/// Recursively replace values whose key case-insensitively matches the
/// closed redaction set, descending into nested objects and arrays.
pub fn scrub(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                if REDACT_KEYS.iter().any(|r| r.eq_ignore_ascii_case(&k)) {
                    out.insert(k, Value::String("[REDACTED]".to_string()));
                } else {
                    out.insert(k, scrub(v));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(scrub).collect()),
        other => other,
    }
}

/// Collects tracing event fields into a JSON object. Non-UTF8/unusual
/// values fall back to their `Debug` representation rather than panicking.
struct FieldCollector(Map<String, Value>);

impl Visit for FieldCollector {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), json!(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), json!(format!("{value:?}")));
    }
}

pub struct JsonRedactingLayer {
    pid: u32,
}

impl JsonRedactingLayer {
    pub fn new() -> Self {
        Self { pid: process::id() }
    }
}

impl Default for JsonRedactingLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Subscriber> Layer<S> for JsonRedactingLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut collector = FieldCollector(Map::new());
        event.record(&mut collector);

        let event_name = collector
            .0
            .remove("message")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| event.metadata().name().to_string());

        let mut record = Map::new();
        record.insert("ts".into(), json!(now_ms()));
        record.insert("level".into(), json!(level_name(*event.metadata().level())));
        record.insert("event".into(), json!(event_name));
        record.insert("pid".into(), json!(self.pid));
        for (k, v) in collector.0 {
            record.insert(k, v);
        }

        emit(Value::Object(record));
    }
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::TRACE | Level::DEBUG => "DEBUG",
        Level::INFO => "INFO",
        Level::WARN => "WARN",
        Level::ERROR => "ERROR",
    }
}

fn now_ms() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Serialize and write one line, scrubbing secrets first. A serialization
/// failure never propagates — it is replaced with a minimal fallback record,
/// matching the original's "logging failure must not crash the worker"
/// contract.
fn emit(record: Value) {
    let scrubbed = scrub(record);
    let line = match serde_json::to_string(&scrubbed) {
        Ok(s) => s,
        Err(e) => {
            let fallback = json!({
                "ts": now_ms(),
                "level": "ERROR",
                "event": "logger.error",
                "error": e.to_string(),
            });
            serde_json::to_string(&fallback).unwrap_or_else(|_| {
                "{\"event\":\"logger.error\",\"error\":\"unserializable\"}".to_string()
            })
        }
    };
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    let _ = writeln!(lock, "{line}");
    let _ = lock.flush();
}

/// Install the global tracing subscriber. `RUST_LOG`/`LOG_LEVEL` controls the
/// filter, defaulting to `info` per the original's `LOG_LEVEL` default of
/// `"debug"` for the scraper and `"info"` elsewhere — callers pass their own
/// service default.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(JsonRedactingLayer::new());
    let _ = tracing::subscriber::set_global_default(subscriber);
}

use tracing_subscriber::layer::SubscriberExt;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrubs_nested_secret_keys_case_insensitively() {
        let input = json!({
            "event": "llm.call",
            "headers": {"Authorization": "Bearer xyz", "Api_Key": "k1"},
            "list": [{"token": "t1"}, {"safe": "ok"}],
        });
        let out = scrub(input);
        assert_eq!(out["headers"]["Authorization"], json!("[REDACTED]"));
        assert_eq!(out["headers"]["Api_Key"], json!("[REDACTED]"));
        assert_eq!(out["list"][0]["token"], json!("[REDACTED]"));
        assert_eq!(out["list"][1]["safe"], json!("ok"));
    }

    #[test]
    fn leaves_non_secret_fields_untouched() {
        let input = json!({"url": "https://example.com", "attempt": 2});
        assert_eq!(scrub(input.clone()), input);
    }
}
