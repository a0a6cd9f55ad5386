//! Summariser configuration (spec.md §6).

use pipeline_core::config::{optional, parsed_with_default, required, with_default};

#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub redis_url: String,
    pub input_queue: String,
    pub output_queue: String,
    pub retry_queue: String,
    pub dlq: String,
    pub max_retries: u32,
    pub schema_version: u32,
    pub log_level: String,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_s: u64,
}

impl SummarizerConfig {
    pub fn load() -> Result<Self, &'static str> {
        Ok(Self {
            redis_url: required("REDIS_URL")?,
            input_queue: with_default("SUMMARIZER_QUEUE", "summarizer:in"),
            output_queue: with_default("OUTPUT_QUEUE", "summarizer:out"),
            retry_queue: with_default("RETRY_QUEUE", "summarizer:retry"),
            dlq: with_default("DLQ", "summarizer:dlq"),
            max_retries: parsed_with_default("MAX_RETRIES", 3u32),
            schema_version: parsed_with_default("JSON_SCHEMA_VERSION", 1u32),
            log_level: with_default("LOG_LEVEL", "info"),
            llm: LlmConfig {
                model: with_default("LLM_MODEL", "gpt-4o-mini"),
                api_key: required("LLM_API_KEY")?,
                base_url: optional("LLM_BASE_URL"),
                temperature: parsed_with_default("LLM_TEMPERATURE", 0.2f32),
                max_tokens: parsed_with_default("LLM_MAX_TOKENS", 800u32),
                timeout_s: parsed_with_default("LLM_TIMEOUT_S", 30u64),
            },
        })
    }
}
