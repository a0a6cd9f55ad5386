//! Cooperative shutdown: the loop finishes its current job and exits after
//! the next pop returns empty, rather than being torn down mid-job.

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Spawns a task that cancels `token` on SIGINT/ctrl-c (and SIGTERM on unix).
/// Call once per binary at startup.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        info!("lifecycle.shutdown_signal_received");
        child.cancel();
    });
    token
}
