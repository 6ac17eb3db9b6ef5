//! JSON file backed sync state.

use super::{acquire_lock, atomic_write, StateFile, StateLock, SyncRecord, SyncState, SyncStore, STATE_VERSION};
use crate::error::{Result, SyncError};
use std::fs;
use std::path::{Path, PathBuf};

/// Sync state stored as a versioned JSON document.
///
/// Every commit rewrites the file atomically, so a crash mid-pass leaves the
/// last committed state intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: SyncState,
    lock: Option<StateLock>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: SyncState::default(),
            lock: None,
        }
    }

    /// State file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state file without taking the pass lock.
    pub fn read(path: &Path) -> Result<SyncState> {
        if !path.exists() {
            return Ok(SyncState::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            SyncError::StateError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let file: StateFile = serde_json::from_str(&content).map_err(|e| {
            SyncError::StateError(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        // Dropping an unknown state would re-create every page remotely.
        if file.version != STATE_VERSION {
            return Err(SyncError::StateError(format!(
                "Unsupported state version {} in {} (expected {})",
                file.version,
                path.display(),
                STATE_VERSION
            )));
        }

        Ok(file.notes)
    }

    /// Remove the state file. Fails while a pass holds the lock.
    pub fn clear(path: &Path) -> Result<()> {
        let _lock = acquire_lock(path)?;
        if path.exists() {
            fs::remove_file(path).map_err(|e| {
                SyncError::StateError(format!("Failed to remove {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let file = StateFile {
            version: STATE_VERSION,
            written_by: env!("CARGO_PKG_VERSION").to_string(),
            notes: self.state.clone(),
        };
        let content = serde_json::to_string_pretty(&file).map_err(|e| {
            SyncError::StateError(format!("Failed to serialize state: {}", e))
        })?;
        atomic_write(&self.path, content.as_bytes())
    }
}

impl SyncStore for JsonFileStore {
    fn begin(&mut self) -> Result<SyncState> {
        if self.lock.is_none() {
            self.lock = Some(acquire_lock(&self.path)?);
        }
        match Self::read(&self.path) {
            Ok(state) => {
                self.state = state;
                Ok(self.state.clone())
            }
            Err(e) => {
                self.lock = None;
                Err(e)
            }
        }
    }

    fn commit(&mut self, key: &str, record: &SyncRecord) -> Result<()> {
        if self.lock.is_none() {
            return Err(SyncError::StateError(
                "commit outside of an active pass".to_string(),
            ));
        }
        self.state.insert(key, record.clone());
        self.save()
    }

    fn finish(&mut self) -> Result<()> {
        self.lock = None;
        Ok(())
    }
}
