//! Schema-bounded LLM interaction: one request/response call, parsed into a
//! typed shape, with a bounded retry loop around the call site (spec.md
//! §4.7).

use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use pipeline_core::envelope::{ArticleForSummary, StoryRef, SummaryHints};

use crate::config::LlmConfig;

const SYSTEM_PROMPT: &str = "You are an expert at structured data extraction. \
Given an article, respond with a single JSON object matching the requested schema. \
Do not include any prose outside the JSON object.";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm call timed out")]
    Timeout,
    #[error("failed to parse llm response as json: {0}")]
    JsonParse(String),
    #[error("llm call failed: {0}")]
    Unknown(String),
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmClassification {
    pub primary_category: Option<String>,
    #[serde(default = "default_type")]
    pub r#type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

fn default_type() -> String {
    "news".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmLinkProps {
    pub paywall: Option<bool>,
    pub format: Option<String>,
    pub is_pdf: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmUi {
    pub summary_140: Option<String>,
    pub quicktake: Option<Vec<String>>,
    pub audience: Option<Vec<String>>,
    pub impact_score: Option<f64>,
    pub confidence: Option<f64>,
    pub reading_time_min: Option<u32>,
    pub link_props: Option<LlmLinkProps>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmResult {
    pub summary: Option<String>,
    #[serde(default)]
    pub classification: LlmClassification,
    #[serde(default)]
    pub ui: LlmUi,
}

pub struct LlmClient {
    client: Client<OpenAIConfig>,
    cfg: LlmConfig,
}

impl LlmClient {
    pub fn new(cfg: LlmConfig) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(&cfg.api_key);
        if let Some(base) = &cfg.base_url {
            config = config.with_api_base(base);
        }
        Self {
            client: Client::with_config(config),
            cfg,
        }
    }

    /// One LLM request/response round trip, given only the restricted field
    /// set spec.md §4.7 names.
    async fn call_once(
        &self,
        story: &StoryRef,
        domain: &str,
        article: &ArticleForSummary,
        hints: &SummaryHints,
        hn_metrics: Option<&serde_json::Value>,
    ) -> Result<LlmResult, LlmError> {
        let user_payload = json!({
            "title": story.title,
            "domain": domain,
            "url": story.url,
            "language": article.language,
            "is_pdf": article.is_pdf,
            "is_paywalled": article.is_paywalled,
            "headings": article.headings,
            "text_head": article.text_head,
            "text_tail": article.text_tail,
            "hn_metrics": hn_metrics,
            "candidate_tags": hints.candidate_tags,
        });

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.cfg.model)
            .temperature(self.cfg.temperature)
            .max_tokens(self.cfg.max_tokens)
            .messages(vec![
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_PROMPT)
                    .build()
                    .map_err(|e| LlmError::Unknown(e.to_string()))?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_payload.to_string())
                    .build()
                    .map_err(|e| LlmError::Unknown(e.to_string()))?
                    .into(),
            ])
            .build()
            .map_err(|e| LlmError::Unknown(e.to_string()))?;

        let response = tokio::time::timeout(
            Duration::from_secs(self.cfg.timeout_s),
            self.client.chat().create(request),
        )
        .await
        .map_err(|_| LlmError::Timeout)?
        .map_err(|e| LlmError::Unknown(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        serde_json::from_str(&content).map_err(|e| LlmError::JsonParse(e.to_string()))
    }

    /// Up to three attempts with 0.5s-doubling backoff on `LlmError`. A
    /// non-LLM error (none occur on this call path, since `call_once` only
    /// ever returns `LlmError`) would break immediately per spec.md §4.7;
    /// encoded here as the loop exiting on the first non-retryable variant.
    pub async fn summarize_with_retry(
        &self,
        story: &StoryRef,
        domain: &str,
        article: &ArticleForSummary,
        hints: &SummaryHints,
        hn_metrics: Option<&serde_json::Value>,
    ) -> Result<LlmResult, LlmError> {
        let mut delay = Duration::from_millis(500);
        let mut last_err = None;
        for attempt in 1..=3 {
            match self.call_once(story, domain, article, hints, hn_metrics).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    warn!(attempt, error = %e, "summarizer.llm.attempt_failed");
                    last_err = Some(e);
                    if attempt < 3 {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }
        debug!("summarizer.llm.retries_exhausted");
        Err(last_err.unwrap_or(LlmError::Unknown("no attempts made".into())))
    }
}
