//! Dispatcher binary: generic multi-queue fan-out worker with per-task
//! retry/DLQ and follow-on enqueue (spec.md §4.8).

mod config;
mod dispatcher;
mod embedder;
mod store;
mod summarizer;
mod tasks;

use std::time::Duration;

use pipeline_core::lifecycle;
use tracing::{error, info};

use crate::config::WorkerConfig;

fn validate_config(cfg: &WorkerConfig) -> Result<(), String> {
    if cfg.max_retries == 0 {
        return Err("MAX_RETRIES must be >= 1".to_string());
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cfg = match WorkerConfig::load() {
        Ok(c) => c,
        Err(missing) => {
            eprintln!(r#"{{"level":"ERROR","event":"setup.missing_config","name":"{missing}"}}"#);
            std::process::exit(1);
        }
    };
    pipeline_core::logging::init(&cfg.log_level);

    if let Err(reason) = validate_config(&cfg) {
        error!(reason, "worker.setup.invalid_config");
        std::process::exit(1);
    }

    let queue = match pipeline_core::Queue::connect(&cfg.redis_url).await {
        Ok(q) => q,
        Err(e) => {
            error!(error = %e, "worker.setup.redis_connect_failed");
            std::process::exit(1);
        }
    };
    if let Err(e) = queue.ping().await {
        error!(error = %e, "worker.setup.redis_ping_failed");
        std::process::exit(1);
    }

    let pool = match store::connect_pool(&cfg.pg_dsn).await {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "worker.setup.db_connect_failed");
            std::process::exit(1);
        }
    };

    info!(queues = ?cfg.queues, max_retries = cfg.max_retries, "worker.startup");

    let fetch_timeout = Duration::from_millis(cfg.fetch_timeout_ms);
    let shutdown = lifecycle::install_signal_handler();

    loop {
        if shutdown.is_cancelled() {
            info!("worker.shutdown.exiting");
            break;
        }

        match dispatcher::run_once(&cfg, &queue, &pool, fetch_timeout).await {
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "worker.dispatch.error");
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }
}
