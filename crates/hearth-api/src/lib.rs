//! HTTP and state-sync server for the Hearth home-automation hub.
//!
//! Controllers keep one websocket open on `/smart-home` and receive the
//! obfuscated device snapshot each time they send a message. Everything
//! else is plain request/response over JSON.

pub mod config;
pub mod handlers;
pub mod models;
pub mod server;
pub mod shutdown;
pub mod sync;

pub use config::{ConfigError, HearthConfig};
pub use models::error::{ApiResult, ErrorResponse};
pub use server::{ServerState, create_router, run, serve};
pub use sync::{
    CloseReason, ConnectionError, ConnectionTracker, MessageChannel, SyncContext, SyncLoop,
    SyncOutcome, SyncSettings, SyncState, SyncStats, serve_connection,
};
