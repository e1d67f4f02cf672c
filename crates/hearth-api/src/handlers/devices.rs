//! Device listing handlers.

use axum::Json;
use axum::extract::State;
use hearth_core::DeviceUptime;

use crate::models::ApiResult;
use crate::server::ServerState;

/// GET /getDevices
pub async fn list_devices_handler(State(state): State<ServerState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.store.distinct_devices()?))
}

/// Per-device current state and time spent on.
///
/// GET /getDevicesUptime
pub async fn devices_uptime_handler(
    State(state): State<ServerState>,
) -> ApiResult<Json<Vec<DeviceUptime>>> {
    let uptime = state.store.devices_uptime(chrono::Utc::now())?;
    Ok(Json(uptime))
}
