//! # Blueprint Store
//!
//! Loads and persists the working blueprint and the post snapshot through a
//! [`SettingsStore`], and reads the optional seed file.
//!
//! The working document is a single value that is always rewritten whole.
//! Callers fetch it, mutate it, and save it inside one critical section
//! (see [`crate::Recorder`]).

use crate::blueprint::Blueprint;
use crate::event::PostSnapshot;
use crate::primitives::{BLUEPRINT_KEY, SNAPSHOT_KEY};
use crate::storage::SettingsStore;
use crate::types::{PostId, RecorderError};
use serde_json::Value;
use std::path::Path;

// =============================================================================
// STORE
// =============================================================================

/// The working blueprint and snapshot slot over a settings backend.
#[derive(Debug, Default)]
pub struct BlueprintStore<S> {
    settings: S,
}

impl<S: SettingsStore> BlueprintStore<S> {
    #[must_use]
    pub fn new(settings: S) -> Self {
        Self { settings }
    }

    /// The underlying settings backend.
    pub fn settings(&self) -> &S {
        &self.settings
    }

    /// The persisted working blueprint, if one exists.
    pub fn load(&self) -> Result<Option<Blueprint>, RecorderError> {
        match self.settings.get(BLUEPRINT_KEY)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| RecorderError::DeserializationError(e.to_string())),
        }
    }

    /// Bump the revision and overwrite the stored blueprint.
    pub fn save(&mut self, blueprint: &mut Blueprint) -> Result<(), RecorderError> {
        blueprint.bump_revision();
        self.write(blueprint)
    }

    /// Return the persisted blueprint, storing `seed` (or the one-step
    /// default) first if nothing is persisted yet.
    pub fn initialize(&mut self, seed: Option<&Blueprint>) -> Result<Blueprint, RecorderError> {
        if let Some(existing) = self.load()? {
            return Ok(existing);
        }
        let initial = seed.cloned().unwrap_or_default();
        self.write(&initial)?;
        Ok(initial)
    }

    /// Discard the working blueprint and start over from `seed`.
    pub fn reset(&mut self, seed: Option<&Blueprint>) -> Result<Blueprint, RecorderError> {
        self.settings.delete(BLUEPRINT_KEY)?;
        self.settings.delete(SNAPSHOT_KEY)?;
        self.initialize(seed)
    }

    /// Remember the pre-update copy of a post.
    pub fn put_snapshot(&mut self, snapshot: &PostSnapshot) -> Result<(), RecorderError> {
        let value = serde_json::to_value(snapshot)
            .map_err(|e| RecorderError::SerializationError(e.to_string()))?;
        self.settings.set(SNAPSHOT_KEY, &value)
    }

    /// Read and clear the snapshot slot if it holds `post`.
    ///
    /// A snapshot of another post stays in the slot. An unreadable snapshot
    /// is cleared and reported as absent.
    pub fn take_snapshot_for(&mut self, post: PostId) -> Result<Option<PostSnapshot>, RecorderError> {
        let Some(value) = self.settings.get(SNAPSHOT_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_value::<PostSnapshot>(value) {
            Ok(snapshot) if snapshot.post_id != post => Ok(None),
            Ok(snapshot) => {
                self.settings.delete(SNAPSHOT_KEY)?;
                Ok(Some(snapshot))
            }
            Err(_) => {
                self.settings.delete(SNAPSHOT_KEY)?;
                Ok(None)
            }
        }
    }

    fn write(&mut self, blueprint: &Blueprint) -> Result<(), RecorderError> {
        let value = serde_json::to_value(blueprint)
            .map_err(|e| RecorderError::SerializationError(e.to_string()))?;
        self.settings.set(BLUEPRINT_KEY, &value)
    }
}

// =============================================================================
// SEED & CLEANING
// =============================================================================

/// Read a seed blueprint from `path`.
///
/// A missing file, an empty file, `null` and `{}` are "no seed". Markers a
/// seed may carry are stripped, so every seed step counts as pre-seeded.
pub fn try_load_seed(path: impl AsRef<Path>) -> Result<Option<Blueprint>, RecorderError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }

    let text = std::fs::read_to_string(path).map_err(|e| RecorderError::IoError(e.to_string()))?;
    if text.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(&text)
        .map_err(|e| RecorderError::DeserializationError(e.to_string()))?;
    if is_empty_document(&value) {
        return Ok(None);
    }

    let seed: Blueprint = serde_json::from_value(value)
        .map_err(|e| RecorderError::DeserializationError(e.to_string()))?;
    Ok(Some(clean(&seed)))
}

/// Like [`try_load_seed`], with every failure treated as "no seed".
#[must_use]
pub fn load_seed(path: impl AsRef<Path>) -> Option<Blueprint> {
    try_load_seed(path).ok().flatten()
}

/// Copy of `blueprint` with every provenance marker removed.
///
/// Idempotent: `clean(&clean(b)) == clean(b)`.
#[must_use]
pub fn clean(blueprint: &Blueprint) -> Blueprint {
    blueprint.cleaned()
}

fn is_empty_document(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

// =============================================================================
// TESTS
// =============================================================================
