//! Server state and constants.

use std::sync::Arc;

use hearth_storage::RecordStore;
use tokio_util::sync::CancellationToken;

use crate::sync::{SyncContext, SyncSettings};

/// Maximum request body size for the JSON endpoints (64 KB).
pub const MAX_REQUEST_BODY_SIZE: usize = 64 * 1024;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<RecordStore>,
    pub sync: SyncContext,
}

impl ServerState {
    pub fn new(store: Arc<RecordStore>, settings: SyncSettings, shutdown: CancellationToken) -> Self {
        let sync = SyncContext::new(store.clone(), settings, shutdown);
        Self { store, sync }
    }
}
