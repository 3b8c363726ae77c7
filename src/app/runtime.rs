use super::SimulationController;
use crate::error::Result;
use crate::events::StopReason;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

impl SimulationController {
    /// Play until the session ends, a shutdown signal arrives or `limit` elapses.
    ///
    /// Returns why the session ended.
    pub async fn run(&self, limit: Option<Duration>) -> Result<StopReason> {
        self.start().await?;

        tokio::select! {
            _ = self.wait_stopped() => {}
            received = shutdown_signal() => {
                info!("Received {} signal", received);
            }
            _ = sleep_for(limit) => {
                info!("Playback duration limit reached");
            }
        }

        self.shutdown().await?;
        Ok(self.context.stop_reason().unwrap_or(StopReason::Requested))
    }
}

/// Resolve on SIGINT (Ctrl+C) or, on unix, SIGTERM
async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
            "SIGINT"
        }
        _ = terminate => "SIGTERM",
    }
}

async fn sleep_for(limit: Option<Duration>) {
    match limit {
        Some(limit) => tokio::time::sleep(limit).await,
        None => std::future::pending().await,
    }
}
