//! Device record handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use hearth_core::{DeviceRecord, NewRecord};

use crate::models::{ApiResult, ErrorResponse};
use crate::server::ServerState;

/// Record a device state change.
///
/// POST /addRecord
///
/// Rejects a malformed body and unregistered devices with 400 before
/// anything is written.
pub async fn add_record_handler(
    State(state): State<ServerState>,
    body: Result<Json<NewRecord>, JsonRejection>,
) -> ApiResult<Json<DeviceRecord>> {
    let Json(record) = body.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Error unmarshalling record body");
        ErrorResponse::bad_request(format!("invalid request body: {}", rejection.body_text()))
    })?;
    record.validate()?;

    tracing::info!(device = %record.device, state = record.state, "Adding record");

    if !state.store.device_exists(&record.device)? {
        tracing::warn!(device = %record.device, "Record for unknown device rejected");
        return Err(ErrorResponse::bad_request(format!(
            "device {} does not exist",
            record.device
        )));
    }

    let stored = state.store.add_record(record)?;
    Ok(Json(stored))
}

/// Latest record of one device.
///
/// GET /getLastByDevice/:device
pub async fn last_by_device_handler(
    State(state): State<ServerState>,
    Path(device): Path<String>,
) -> ApiResult<Json<DeviceRecord>> {
    match state.store.last_by_device(&device)? {
        Some(record) => Ok(Json(record)),
        None => Err(ErrorResponse::not_found(format!("record for device {}", device))),
    }
}
