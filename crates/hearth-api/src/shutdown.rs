//! Graceful shutdown handling for the server.

use std::time::Duration;

use crate::server::ServerState;

/// Grace period for controller connections after cancellation.
pub const CONNECTION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Cancel controller connections and wait briefly for them to close.
pub async fn drain_connections(state: &ServerState) {
    state.sync.shutdown.cancel();

    let connections = state.sync.connections.clone();
    let drained = tokio::time::timeout(CONNECTION_DRAIN_TIMEOUT, async move {
        while connections.active() > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;

    if drained.is_err() {
        tracing::warn!(
            active = state.sync.connections.active(),
            "Controller connections still open after drain timeout"
        );
    }

    let connections = &state.sync.connections;
    tracing::info!(
        accepted = connections.accepted(),
        pushes = connections.total_pushes(),
        aborted = connections.aborted(),
        "Shutdown complete. Server uptime: {} seconds",
        connections.uptime_secs()
    );
}
