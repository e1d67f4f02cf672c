//! Device history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Maximum length of a device identifier.
pub const MAX_DEVICE_ID_LEN: usize = 128;

/// A stored on/off transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Store-assigned identifier, increasing with insertion order
    pub id: u64,
    /// Device identifier
    pub device: String,
    /// Reported state
    pub state: bool,
    /// When the store accepted the record
    pub date: DateTime<Utc>,
}

/// Body of a record ingestion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    pub device: String,
    pub state: bool,
}

impl NewRecord {
    pub fn new(device: impl Into<String>, state: bool) -> Self {
        Self {
            device: device.into(),
            state,
        }
    }

    /// Validate the record shape before it reaches the store.
    pub fn validate(&self) -> Result<()> {
        validate_device_id(&self.device)
    }
}

/// Check a device identifier for emptiness and length.
pub fn validate_device_id(device: &str) -> Result<()> {
    if device.trim().is_empty() {
        return Err(Error::InvalidInput("device cannot be empty".to_string()));
    }
    if device.len() > MAX_DEVICE_ID_LEN {
        return Err(Error::InvalidInput(format!(
            "device exceeds {} bytes",
            MAX_DEVICE_ID_LEN
        )));
    }
    Ok(())
}

/// Per-device uptime aggregated from history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceUptime {
    pub device: String,
    /// Current state
    pub state: bool,
    /// Total seconds spent switched on
    pub on_seconds: i64,
    /// Timestamp of the most recent record, if any
    pub last_change: Option<DateTime<Utc>>,
}
