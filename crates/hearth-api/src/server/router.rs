//! Application router configuration.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::types::{MAX_REQUEST_BODY_SIZE, ServerState};

/// Create the application router with a specific state.
pub fn create_router(state: ServerState) -> Router {
    use crate::handlers::{basic, devices, records, sync};

    Router::new()
        // Health check
        .route("/hc", get(basic::health_check_handler))
        // Records
        .route("/addRecord", post(records::add_record_handler))
        .route("/getLastByDevice/:device", get(records::last_by_device_handler))
        // Devices
        .route("/getDevices", get(devices::list_devices_handler))
        .route("/getDevicesUptime", get(devices::devices_uptime_handler))
        // Controller state sync
        .route("/smart-home", get(sync::smart_home_handler))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_SIZE))
        .with_state(state)
}
