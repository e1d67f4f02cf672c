//! Error types shared across Hearth crates.

use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type.
#[derive(Debug, Error)]
pub enum Error {
    /// The referenced device is not registered.
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    /// Input failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Obfuscation key rejected.
    #[error("Invalid obfuscation key: {0}")]
    InvalidKey(String),

    /// Payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backing store failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Whether the error was caused by the caller rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::UnknownDevice(_) | Error::InvalidInput(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(Error::UnknownDevice("lamp".into()).is_client_error());
        assert!(Error::InvalidInput("empty".into()).is_client_error());
        assert!(!Error::Storage("disk".into()).is_client_error());
        assert!(!Error::Serialization("bad".into()).is_client_error());
    }

    #[test]
    fn test_display() {
        let err = Error::UnknownDevice("heater".to_string());
        assert_eq!(err.to_string(), "Unknown device: heater");
    }
}
