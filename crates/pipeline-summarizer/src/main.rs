//! Summariser binary: validate → claim → LLM summarise/classify → emit,
//! with bounded retry and schema-mismatch/LLM-failure DLQ routing
//! (spec.md §4.7).

mod config;
mod disposition;
mod llm;
mod orchestrate;
mod validate;

use pipeline_core::lifecycle;
use tracing::{error, info};

use crate::config::SummarizerConfig;
use crate::llm::LlmClient;

/// Startup validation mirroring `summarizer-py/app/main.py::setup_and_validate`:
/// required config present, numeric ranges sane, Redis reachable.
fn validate_config(cfg: &SummarizerConfig) -> Result<(), String> {
    if cfg.max_retries == 0 {
        return Err("MAX_RETRIES must be >= 1".to_string());
    }
    if cfg.schema_version < 1 {
        return Err("JSON_SCHEMA_VERSION must be >= 1".to_string());
    }
    if !(0.0..=2.0).contains(&cfg.llm.temperature) {
        return Err(format!("LLM_TEMPERATURE must be 0-2, got {}", cfg.llm.temperature));
    }
    if cfg.llm.max_tokens < 1 {
        return Err("LLM_MAX_TOKENS must be > 0".to_string());
    }
    if let Some(base) = &cfg.llm.base_url {
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(format!("LLM_BASE_URL must be a valid URL, got: {base}"));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cfg = match SummarizerConfig::load() {
        Ok(c) => c,
        Err(missing) => {
            eprintln!(r#"{{"level":"ERROR","event":"setup.missing_config","name":"{missing}"}}"#);
            std::process::exit(1);
        }
    };
    pipeline_core::logging::init(&cfg.log_level);

    if let Err(reason) = validate_config(&cfg) {
        error!(reason, "summarizer.setup.invalid_config");
        std::process::exit(1);
    }

    let queue = match pipeline_core::Queue::connect(&cfg.redis_url).await {
        Ok(q) => q,
        Err(e) => {
            error!(error = %e, "summarizer.setup.redis_connect_failed");
            std::process::exit(1);
        }
    };
    if let Err(e) = queue.ping().await {
        error!(error = %e, "summarizer.setup.redis_ping_failed");
        std::process::exit(1);
    }

    let llm = LlmClient::new(cfg.llm.clone());

    info!(
        input_queue = %cfg.input_queue,
        model = %cfg.llm.model,
        "summarizer.startup"
    );

    // Runs until shutdown (spec.md §9 resolves the 5-iteration dev cap in
    // original_source's `worker.py::worker_main` as non-authoritative).
    let shutdown = lifecycle::install_signal_handler();

    loop {
        if shutdown.is_cancelled() {
            info!("summarizer.shutdown.exiting");
            break;
        }

        let job = match orchestrate::pop_next(&cfg, &queue).await {
            Ok(Some(job)) => job,
            Ok(None) => continue,
            Err(e) => {
                error!(error = %e, "summarizer.pop.error");
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                continue;
            }
        };

        let _ = orchestrate::process_job(&cfg, &queue, &llm, job).await;
    }
}
