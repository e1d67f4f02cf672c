//! Server configuration.
//!
//! Sources in priority order:
//! 1. Environment variables (`HEARTH_*`)
//! 2. The TOML file given on the command line, or `hearth.toml` in the
//!    working directory when present
//! 3. Built-in defaults

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use hearth_core::{ObfuscationKey, Obfuscator};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::sync::SyncSettings;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "hearth.toml";

pub const ENV_HOST: &str = "HEARTH_HOST";
pub const ENV_PORT: &str = "HEARTH_PORT";
pub const ENV_DB_PATH: &str = "HEARTH_DB_PATH";
pub const ENV_SYNC_KEY: &str = "HEARTH_SYNC_KEY";
pub const ENV_IDLE_TIMEOUT: &str = "HEARTH_IDLE_TIMEOUT_SECS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HearthConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    /// Devices registered at startup. Registration is idempotent.
    pub devices: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                field: "server.host",
                message: e.to_string(),
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/hearth.redb"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Obfuscation key shared with the controllers. The built-in key is
    /// used when unset.
    pub key: Option<String>,
    /// Seconds to wait for a controller message. 0 disables the deadline.
    pub idle_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            key: None,
            idle_timeout_secs: crate::sync::DEFAULT_IDLE_TIMEOUT.as_secs(),
        }
    }
}

impl SyncConfig {
    pub fn obfuscator(&self) -> Result<Obfuscator, ConfigError> {
        match &self.key {
            Some(key) => ObfuscationKey::new(key)
                .map(Obfuscator::new)
                .map_err(|e| ConfigError::Invalid {
                    field: "sync.key",
                    message: e.to_string(),
                }),
            None => Ok(Obfuscator::default()),
        }
    }

    pub fn settings(&self) -> Result<SyncSettings, ConfigError> {
        let idle_timeout = match self.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Ok(SyncSettings {
            obfuscator: self.obfuscator()?,
            idle_timeout,
        })
    }
}

impl HearthConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] if it exists, then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                info!(category = "config", "No config file, using defaults");
                Self::default()
            }
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(category = "config", "Loading config from: {}", path.display());
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `HEARTH_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port.parse().map_err(|_| ConfigError::Invalid {
                field: ENV_PORT,
                message: format!("not a port number: {}", port),
            })?;
        }
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.storage.path = PathBuf::from(path);
        }
        if let Some(key) = lookup(ENV_SYNC_KEY) {
            self.sync.key = Some(key);
        }
        if let Some(secs) = lookup(ENV_IDLE_TIMEOUT) {
            self.sync.idle_timeout_secs = secs.parse().map_err(|_| ConfigError::Invalid {
                field: ENV_IDLE_TIMEOUT,
                message: format!("not a number of seconds: {}", secs),
            })?;
        }
        Ok(())
    }

    /// Check everything that can be checked without touching the network or disk.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.bind_addr()?;
        self.sync.obfuscator()?;
        for device in &self.devices {
            hearth_core::record::validate_device_id(device).map_err(|e| {
                ConfigError::Invalid {
                    field: "devices",
                    message: e.to_string(),
                }
            })?;
        }
        Ok(())
    }
}
