//! Common test utilities for API tests.
#![allow(dead_code)]

use std::sync::Arc;

use hearth_api::ServerState;
use hearth_api::sync::SyncSettings;
use hearth_storage::RecordStore;
use tokio_util::sync::CancellationToken;

/// Server state over a temporary store with `devices` registered.
pub fn create_test_server_state(devices: &[&str]) -> ServerState {
    create_test_server_state_with(devices, SyncSettings::default())
}

pub fn create_test_server_state_with(devices: &[&str], settings: SyncSettings) -> ServerState {
    let store = RecordStore::memory().unwrap();
    for device in devices {
        store.register_device(device).unwrap();
    }
    ServerState::new(Arc::new(store), settings, CancellationToken::new())
}
