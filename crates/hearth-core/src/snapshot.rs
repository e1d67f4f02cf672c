//! Device state snapshots and the source that produces them.
//!
//! A snapshot is a point-in-time mapping from device identifier to its
//! on/off state. Snapshots are produced fresh on every fetch and never
//! cached; the sync channel asks its [`SnapshotSource`] once per client
//! message.

use std::collections::BTreeMap;
use std::io;

use serde::{Deserialize, Serialize};
use serde_json::ser::{CompactFormatter, Formatter};

use crate::{Error, Result};

/// The message a controller sends when it has nothing new to report.
pub const HEARTBEAT: &str = "OK\n";

/// Whether a client message is the plain heartbeat.
pub fn is_heartbeat(message: &str) -> bool {
    message == HEARTBEAT
}

/// Point-in-time mapping of device identifier to on/off state.
///
/// Backed by an ordered map so identical mappings always serialize to
/// identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceStateSnapshot {
    states: BTreeMap<String, bool>,
}

impl DeviceStateSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: add a device state.
    pub fn with_device(mut self, device: impl Into<String>, state: bool) -> Self {
        self.states.insert(device.into(), state);
        self
    }

    /// Set the state of a device.
    pub fn insert(&mut self, device: impl Into<String>, state: bool) {
        self.states.insert(device.into(), state);
    }

    /// State of a single device.
    pub fn get(&self, device: &str) -> Option<bool> {
        self.states.get(device).copied()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Iterate over `(device, state)` pairs in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.states.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Serialize into the wire representation.
    ///
    /// The wire form is compact JSON in which every non-ASCII character is
    /// written as a `\uXXXX` escape, so the output is pure ASCII.
    pub fn to_wire(&self) -> Result<String> {
        let mut buf = Vec::with_capacity(self.states.len() * 16 + 2);
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, AsciiFormatter);
        self.states.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Parse a plaintext wire payload.
    pub fn from_wire(payload: &str) -> Result<Self> {
        let states: BTreeMap<String, bool> = serde_json::from_str(payload)?;
        Ok(Self { states })
    }
}

impl FromIterator<(String, bool)> for DeviceStateSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self {
            states: iter.into_iter().collect(),
        }
    }
}

impl From<BTreeMap<String, bool>> for DeviceStateSnapshot {
    fn from(states: BTreeMap<String, bool>) -> Self {
        Self { states }
    }
}

/// Compact JSON formatter that escapes everything outside ASCII.
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if fragment.is_ascii() {
            return CompactFormatter.write_string_fragment(writer, fragment);
        }
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}

/// Provider of fresh device state snapshots.
///
/// Implementations must tolerate concurrent calls from any number of
/// sync connections; callers never lock around them.
pub trait SnapshotSource: Send + Sync {
    /// Fetch the current state of every registered device.
    fn snapshot(&self) -> Result<DeviceStateSnapshot>;

    /// Whether a device identifier is registered.
    fn device_exists(&self, device: &str) -> Result<bool>;
}
