//! Scraper binary: fetch → extract → persist → emit, with headless
//! fallback and retry/DLQ routing (spec.md §4.3-§4.9).

mod config;
mod disposition;
mod extractor;
mod fetcher;
mod orchestrate;
mod payloads;
mod store;

use pipeline_core::lifecycle;
use tracing::{error, info};

use crate::config::ScraperConfig;
use crate::fetcher::Fetcher;

#[tokio::main]
async fn main() {
    let cfg = match ScraperConfig::load() {
        Ok(c) => c,
        Err(missing) => {
            eprintln!(r#"{{"level":"ERROR","event":"setup.missing_config","name":"{missing}"}}"#);
            std::process::exit(1);
        }
    };
    pipeline_core::logging::init(&cfg.log_level);

    let queue = match pipeline_core::Queue::connect(&cfg.redis_url).await {
        Ok(q) => q,
        Err(e) => {
            error!(error = %e, "scraper.setup.redis_connect_failed");
            std::process::exit(1);
        }
    };
    if let Err(e) = queue.ping().await {
        error!(error = %e, "scraper.setup.redis_ping_failed");
        std::process::exit(1);
    }

    let pool = match store::connect_pool(&cfg.pg_dsn).await {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "scraper.setup.db_connect_failed");
            std::process::exit(1);
        }
    };

    let fetcher = match Fetcher::new(cfg.fetch_timeout, cfg.user_agent.clone(), cfg.proxy.clone()) {
        Ok(f) => f,
        Err(e) => {
            error!(error = %e, "scraper.setup.fetcher_build_failed");
            std::process::exit(1);
        }
    };

    info!(
        input_queue = %cfg.input_queue,
        headless_enabled = cfg.headless_enabled,
        "scraper.startup"
    );

    let shutdown = lifecycle::install_signal_handler();

    loop {
        if shutdown.is_cancelled() {
            info!("scraper.shutdown.exiting");
            break;
        }

        let job = match orchestrate::pop_next(&cfg, &queue).await {
            Ok(Some(job)) => job,
            Ok(None) => continue,
            Err(e) => {
                error!(error = %e, "scraper.pop.error");
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                continue;
            }
        };

        let _ = orchestrate::process_job(&cfg, &queue, &pool, &fetcher, job).await;
    }

    pool.close().await;
}
