//! # redb-backed Settings Storage
//!
//! A disk-backed settings store using the redb embedded database.
//!
//! One table maps setting names to their JSON text. Every write is its own
//! transaction, so a crash never leaves a half-written blueprint behind.

use super::SettingsStore;
use crate::types::RecorderError;
use redb::{Database, ReadableDatabase, TableDefinition};
use serde_json::Value;
use std::path::Path;

/// Table for settings: name -> JSON bytes
const SETTINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");

fn io_err(e: impl std::fmt::Display) -> RecorderError {
    RecorderError::Storage(e.to_string())
}

/// A disk-backed settings store.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a settings database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecorderError> {
        let db = Database::create(path.as_ref())
            .map_err(|e| RecorderError::IoError(e.to_string()))?;

        // Create the table so later reads never hit a missing table.
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(SETTINGS).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db })
    }
}

impl SettingsStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<Value>, RecorderError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(SETTINGS).map_err(io_err)?;
        let Some(bytes) = table.get(key).map_err(io_err)? else {
            return Ok(None);
        };
        serde_json::from_slice(bytes.value())
            .map(Some)
            .map_err(|e| RecorderError::DeserializationError(e.to_string()))
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<(), RecorderError> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| RecorderError::SerializationError(e.to_string()))?;

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(SETTINGS).map_err(io_err)?;
            table.insert(key, bytes.as_slice()).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }

    fn delete(&mut self, key: &str) -> Result<(), RecorderError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(SETTINGS).map_err(io_err)?;
            table.remove(key).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)
    }
}
