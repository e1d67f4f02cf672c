//! Core types for the Hearth home-automation hub.
//!
//! This crate defines the domain model shared by the store, the HTTP layer
//! and the state-sync channel: device snapshots, history records and the
//! payload obfuscation applied to everything pushed to controllers.

pub mod error;
pub mod obfuscation;
pub mod record;
pub mod snapshot;

pub use error::{Error, Result};
pub use obfuscation::{DEFAULT_OBFUSCATION_KEY, ObfuscationKey, Obfuscator};
pub use record::{DeviceRecord, DeviceUptime, NewRecord};
pub use snapshot::{DeviceStateSnapshot, HEARTBEAT, SnapshotSource, is_heartbeat};

