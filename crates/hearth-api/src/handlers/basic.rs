//! Health check handler.

use axum::extract::State;

use crate::server::ServerState;

/// Availability token returned when the store answers.
pub const HEALTHY: &str = "OK\n";
/// Availability token returned when it does not.
pub const UNHEALTHY: &str = "NOT_OK\n";

/// GET /hc
pub async fn health_check_handler(State(state): State<ServerState>) -> &'static str {
    match state.store.health_check() {
        Ok(()) => HEALTHY,
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            UNHEALTHY
        }
    }
}
