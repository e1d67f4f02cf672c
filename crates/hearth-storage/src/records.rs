//! Device registry and on/off history.
//!
//! Three tables live in one redb file:
//! - `devices`: device id -> [`DeviceEntry`] (current state, last record)
//! - `records`: record id -> [`DeviceRecord`]
//! - `record_meta`: counters, currently only the next record id

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use hearth_core::record::validate_device_id;
use hearth_core::{DeviceRecord, DeviceStateSnapshot, DeviceUptime, NewRecord, SnapshotSource};

use crate::{Error, Result};

// Devices table: key = device id, value = DeviceEntry (JSON)
const DEVICES_TABLE: TableDefinition<&str, Vec<u8>> = TableDefinition::new("devices");

// Records table: key = record id, value = DeviceRecord (JSON)
const RECORDS_TABLE: TableDefinition<u64, Vec<u8>> = TableDefinition::new("records");

// Counters
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("record_meta");

const NEXT_RECORD_ID: &str = "next_record_id";

/// Registry entry for a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DeviceEntry {
    state: bool,
    registered_at: DateTime<Utc>,
    #[serde(default)]
    last_record: Option<u64>,
}

/// redb-backed store for devices and their history.
pub struct RecordStore {
    db: Database,
    /// Path to the database file
    path: PathBuf,
    /// Set for databases created by [`RecordStore::memory`]; removed on drop.
    temp_path: Option<PathBuf>,
}

impl RecordStore {
    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = if path_ref.exists() {
            Database::open(path_ref)?
        } else {
            Database::create(path_ref)?
        };

        let store = Self {
            db,
            path: path_ref.to_path_buf(),
            temp_path: None,
        };
        store.ensure_tables()?;

        tracing::debug!(path = %path_ref.display(), "Record store opened");
        Ok(store)
    }

    /// Create a throwaway store backed by a temporary file.
    pub fn memory() -> Result<Self> {
        let temp_path =
            std::env::temp_dir().join(format!("hearth_records_{}.redb", uuid::Uuid::new_v4()));
        let mut store = Self::open(&temp_path)?;
        store.temp_path = Some(temp_path);
        Ok(store)
    }

    /// Get the database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure all required tables exist
    fn ensure_tables(&self) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(DEVICES_TABLE)?;
            let _ = write_txn.open_table(RECORDS_TABLE)?;
            let _ = write_txn.open_table(META_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Register a device. Returns `true` if it was not known before.
    ///
    /// New devices start switched off.
    pub fn register_device(&self, device: &str) -> Result<bool> {
        validate_device_id(device)?;

        let write_txn = self.db.begin_write()?;
        let created = {
            let mut table = write_txn.open_table(DEVICES_TABLE)?;
            let exists = table.get(device)?.is_some();
            if !exists {
                let entry = DeviceEntry {
                    state: false,
                    registered_at: Utc::now(),
                    last_record: None,
                };
                table.insert(device, serde_json::to_vec(&entry)?)?;
            }
            !exists
        };
        write_txn.commit()?;

        if created {
            tracing::info!(device = %device, "Device registered");
        }
        Ok(created)
    }

    /// Whether a device is registered.
    pub fn device_exists(&self, device: &str) -> Result<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DEVICES_TABLE)?;
        Ok(table.get(device)?.is_some())
    }

    /// Store an on/off transition.
    ///
    /// Unknown devices are rejected with [`Error::UnknownDevice`] and nothing
    /// is written. On success the device's current state follows the record.
    pub fn add_record(&self, record: NewRecord) -> Result<DeviceRecord> {
        record.validate()?;

        let write_txn = self.db.begin_write()?;
        let stored = {
            let mut devices = write_txn.open_table(DEVICES_TABLE)?;
            let entry_bytes = devices.get(record.device.as_str())?.map(|v| v.value());
            let Some(entry_bytes) = entry_bytes else {
                // Dropping the transaction aborts it.
                return Err(Error::UnknownDevice(record.device));
            };
            let mut entry: DeviceEntry = serde_json::from_slice(&entry_bytes)?;

            let mut meta = write_txn.open_table(META_TABLE)?;
            let id = meta.get(NEXT_RECORD_ID)?.map(|v| v.value()).unwrap_or(1);

            let stored = DeviceRecord {
                id,
                device: record.device,
                state: record.state,
                date: Utc::now(),
            };

            let mut records = write_txn.open_table(RECORDS_TABLE)?;
            records.insert(id, serde_json::to_vec(&stored)?)?;

            entry.state = stored.state;
            entry.last_record = Some(id);
            devices.insert(stored.device.as_str(), serde_json::to_vec(&entry)?)?;

            meta.insert(NEXT_RECORD_ID, id + 1)?;
            stored
        };
        write_txn.commit()?;

        tracing::debug!(id = stored.id, device = %stored.device, state = stored.state, "Record stored");
        Ok(stored)
    }

    /// Most recent record of a device.
    ///
    /// Returns [`Error::UnknownDevice`] for unregistered devices and
    /// `Ok(None)` when the device has no history yet.
    pub fn last_by_device(&self, device: &str) -> Result<Option<DeviceRecord>> {
        let read_txn = self.db.begin_read()?;
        let devices = read_txn.open_table(DEVICES_TABLE)?;
        let entry: DeviceEntry = match devices.get(device)? {
            Some(value) => serde_json::from_slice(&value.value())?,
            None => return Err(Error::UnknownDevice(device.to_string())),
        };

        let Some(id) = entry.last_record else {
            return Ok(None);
        };

        let records = read_txn.open_table(RECORDS_TABLE)?;
        match records.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value.value())?)),
            None => Err(Error::Storage(format!(
                "record {} referenced by device {} is missing",
                id, device
            ))),
        }
    }

    /// All registered device identifiers, sorted.
    pub fn distinct_devices(&self) -> Result<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DEVICES_TABLE)?;

        let mut devices = Vec::new();
        for result in table.iter()? {
            let (key, _value) = result?;
            devices.push(key.value().to_string());
        }
        Ok(devices)
    }

    /// Current state of every registered device.
    pub fn states(&self) -> Result<DeviceStateSnapshot> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DEVICES_TABLE)?;

        let mut snapshot = DeviceStateSnapshot::new();
        for result in table.iter()? {
            let (key, value) = result?;
            let entry: DeviceEntry = serde_json::from_slice(&value.value())?;
            snapshot.insert(key.value(), entry.state);
        }
        Ok(snapshot)
    }

    /// Time each device has spent switched on, up to `now`.
    ///
    /// Every `on` record opens an interval that the next record of the same
    /// device closes; an interval still open at the end is closed at `now`.
    pub fn devices_uptime(&self, now: DateTime<Utc>) -> Result<Vec<DeviceUptime>> {
        let read_txn = self.db.begin_read()?;
        let devices = read_txn.open_table(DEVICES_TABLE)?;
        let records = read_txn.open_table(RECORDS_TABLE)?;

        // device -> (on since, accumulated seconds, last change)
        let mut acc: HashMap<String, (Option<DateTime<Utc>>, i64, Option<DateTime<Utc>>)> =
            HashMap::new();

        for result in records.iter()? {
            let (_id, value) = result?;
            let record: DeviceRecord = serde_json::from_slice(&value.value())?;
            let slot = acc.entry(record.device).or_insert((None, 0, None));
            if let Some(since) = slot.0.take() {
                slot.1 += (record.date - since).num_seconds().max(0);
            }
            if record.state {
                slot.0 = Some(record.date);
            }
            slot.2 = Some(record.date);
        }

        let mut uptime = Vec::new();
        for result in devices.iter()? {
            let (key, value) = result?;
            let device = key.value().to_string();
            let entry: DeviceEntry = serde_json::from_slice(&value.value())?;
            let (on_since, mut on_seconds, last_change) =
                acc.remove(&device).unwrap_or((None, 0, None));
            if let Some(since) = on_since {
                on_seconds += (now - since).num_seconds().max(0);
            }
            uptime.push(DeviceUptime {
                device,
                state: entry.state,
                on_seconds,
                last_change,
            });
        }
        Ok(uptime)
    }

    /// Number of stored records.
    pub fn record_count(&self) -> Result<u64> {
        use redb::ReadableTableMetadata;

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECORDS_TABLE)?;
        Ok(table.len()?)
    }

    /// Check that the database answers a read transaction.
    pub fn health_check(&self) -> Result<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(DEVICES_TABLE)?;
        Ok(())
    }
}

impl SnapshotSource for RecordStore {
    fn snapshot(&self) -> hearth_core::Result<DeviceStateSnapshot> {
        Ok(self.states()?)
    }

    fn device_exists(&self, device: &str) -> hearth_core::Result<bool> {
        Ok(RecordStore::device_exists(self, device)?)
    }
}

/// Cleanup temporary database file when the store is dropped.
impl Drop for RecordStore {
    fn drop(&mut self) {
        if let Some(temp_path) = &self.temp_path {
            if let Err(e) = std::fs::remove_file(temp_path) {
                tracing::debug!(
                    "Failed to remove temporary database file {}: {}",
                    temp_path.display(),
                    e
                );
            }
        }
    }
}
