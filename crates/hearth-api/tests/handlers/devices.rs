//! Tests for device listing.

use axum::extract::State;
use hearth_api::handlers::devices::*;
use hearth_core::NewRecord;

#[tokio::test]
async fn test_list_devices() {
    let state = crate::common::create_test_server_state(&["lamp", "fan"]);
    let devices = list_devices_handler(State(state)).await.unwrap().0;
    assert_eq!(devices, vec!["fan".to_string(), "lamp".to_string()]);
}

#[tokio::test]
async fn test_list_devices_empty() {
    let state = crate::common::create_test_server_state(&[]);
    let devices = list_devices_handler(State(state)).await.unwrap().0;
    assert!(devices.is_empty());
}

#[tokio::test]
async fn test_devices_uptime() {
    let state = crate::common::create_test_server_state(&["lamp", "fan"]);
    state.store.add_record(NewRecord::new("lamp", true)).unwrap();

    let uptime = devices_uptime_handler(State(state)).await.unwrap().0;
    assert_eq!(uptime.len(), 2);

    let lamp = uptime.iter().find(|u| u.device == "lamp").unwrap();
    assert!(lamp.state);
    assert!(lamp.on_seconds >= 0);
    assert!(lamp.last_change.is_some());

    let fan = uptime.iter().find(|u| u.device == "fan").unwrap();
    assert!(!fan.state);
    assert_eq!(fan.on_seconds, 0);
    assert!(fan.last_change.is_none());
}
