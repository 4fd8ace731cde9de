//! OS termination signals.

use std::sync::Arc;
use tracing::{error, info};

use super::bot::Shared;

/// Wait for SIGINT or SIGTERM, then request a stop.
pub(super) async fn listen_for_termination(shared: Arc<Shared>) {
    match wait_for_termination().await {
        Ok(signal) => {
            info!(bot = %shared.name, signal, "received termination signal");
            shared.request_stop();
        }
        Err(e) => error!(bot = %shared.name, "unable to listen for termination signals: {e}"),
    }
}

#[cfg(unix)]
async fn wait_for_termination() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => Ok("SIGTERM"),
        _ = sigint.recv() => Ok("SIGINT"),
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}
