//! Reversible payload obfuscation for the state-sync channel.
//!
//! Every snapshot pushed to a controller is XORed byte-wise with a fixed
//! process-wide key. This hides the plaintext on the wire but gives no
//! security guarantees. The transform is its own inverse, so controllers
//! recover the mapping by applying the same key again.
//!
//! Keys are restricted to ASCII so that obfuscating the ASCII wire form of a
//! snapshot yields ASCII again, which keeps the result valid for a text frame.

use std::fmt;
use std::sync::Arc;

use crate::snapshot::DeviceStateSnapshot;
use crate::{Error, Result};

/// Key used when no key is configured.
pub const DEFAULT_OBFUSCATION_KEY: &str = "hearth-default-key";

/// Validated obfuscation key.
#[derive(Clone, PartialEq, Eq)]
pub struct ObfuscationKey(Arc<[u8]>);

impl ObfuscationKey {
    /// Create a key from raw bytes.
    ///
    /// The key must be non-empty and every byte must lie in `0x01..=0x7F`.
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(Error::InvalidKey("key cannot be empty".to_string()));
        }
        if let Some(pos) = key.iter().position(|b| *b == 0 || !b.is_ascii()) {
            return Err(Error::InvalidKey(format!(
                "byte {:#04x} at offset {} is outside 0x01..=0x7f",
                key[pos], pos
            )));
        }
        Ok(Self(Arc::from(key)))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ObfuscationKey {
    fn default() -> Self {
        Self(Arc::from(DEFAULT_OBFUSCATION_KEY.as_bytes()))
    }
}

// Never print key material.
impl fmt::Debug for ObfuscationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObfuscationKey({} bytes)", self.0.len())
    }
}

/// Symmetric XOR transform with a fixed key.
#[derive(Debug, Clone, Default)]
pub struct Obfuscator {
    key: ObfuscationKey,
}

impl Obfuscator {
    pub fn new(key: ObfuscationKey) -> Self {
        Self { key }
    }

    /// XOR `data` with the key repeated cyclically.
    ///
    /// Length-preserving and its own inverse.
    pub fn apply(&self, data: &[u8]) -> Vec<u8> {
        data.iter()
            .zip(self.key.0.iter().cycle())
            .map(|(byte, key)| byte ^ key)
            .collect()
    }

    /// Serialize a snapshot and obfuscate it for transmission.
    pub fn obfuscate_snapshot(&self, snapshot: &DeviceStateSnapshot) -> Result<String> {
        let wire = snapshot.to_wire()?;
        self.obfuscate_text(&wire)
    }

    /// Recover a snapshot from an obfuscated payload.
    pub fn deobfuscate_snapshot(&self, payload: &str) -> Result<DeviceStateSnapshot> {
        let plain = self.obfuscate_text(payload)?;
        DeviceStateSnapshot::from_wire(&plain)
    }

    /// Apply the transform to text.
    ///
    /// ASCII input always produces ASCII output. Non-ASCII input is rejected
    /// rather than producing bytes that are not valid UTF-8.
    pub fn obfuscate_text(&self, text: &str) -> Result<String> {
        if !text.is_ascii() {
            return Err(Error::InvalidInput(
                "payload contains non-ASCII characters".to_string(),
            ));
        }
        String::from_utf8(self.apply(text.as_bytes()))
            .map_err(|e| Error::Serialization(e.to_string()))
    }
}
