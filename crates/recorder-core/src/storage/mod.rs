//! # Settings Storage
//!
//! The key/value port the recorder persists through.
//!
//! The host owns arbitrary named settings; the recorder only needs three
//! operations on JSON values. Two backends implement the port:
//! - `MemoryStore`: a `BTreeMap` (fast, volatile)
//! - `RedbStore`: a redb database (ACID, persistent)

mod redb_store;

pub use redb_store::RedbStore;

use crate::types::RecorderError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Named JSON settings, as the host stores them.
pub trait SettingsStore {
    /// Read a setting. `None` if it was never written or was deleted.
    fn get(&self, key: &str) -> Result<Option<Value>, RecorderError>;

    /// Write a setting, replacing any previous value.
    fn set(&mut self, key: &str, value: &Value) -> Result<(), RecorderError>;

    /// Remove a setting. Removing a missing key is not an error.
    fn delete(&mut self, key: &str) -> Result<(), RecorderError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Volatile settings store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored settings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, RecorderError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<(), RecorderError> {
        self.entries.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), RecorderError> {
        self.entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// BACKEND SELECTION
// =============================================================================

/// Storage backend chosen at startup.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory settings (volatile).
    InMemory(MemoryStore),
    /// Disk-backed settings using redb (ACID, persistent).
    Persistent(RedbStore),
}

// NOTE: StorageBackend does NOT implement Clone.
// A redb database handle cannot be shared by two owners.

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl StorageBackend {
    /// Open (or create) a redb database at `path`.
    pub fn redb(path: impl AsRef<Path>) -> Result<Self, RecorderError> {
        Ok(Self::Persistent(RedbStore::open(path)?))
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }
}

impl SettingsStore for StorageBackend {
    fn get(&self, key: &str) -> Result<Option<Value>, RecorderError> {
        match self {
            Self::InMemory(store) => store.get(key),
            Self::Persistent(store) => store.get(key),
        }
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<(), RecorderError> {
        match self {
            Self::InMemory(store) => store.set(key, value),
            Self::Persistent(store) => store.set(key, value),
        }
    }

    fn delete(&mut self, key: &str) -> Result<(), RecorderError> {
        match self {
            Self::InMemory(store) => store.delete(key),
            Self::Persistent(store) => store.delete(key),
        }
    }
}
