//! Persisted sync state.
//!
//! The state maps each note key (vault-relative path) to the fingerprint of
//! the content last written to the remote page and that page's id. It is read
//! once at the start of a pass and written after every successful file, so
//! every stored fingerprint corresponds to a confirmed remote write.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use crate::detect::Fingerprint;
use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current state file format version. Increment when the format changes.
pub const STATE_VERSION: u32 = 1;

/// What is known about one synced note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    /// Fingerprint of the content last written.
    pub fingerprint: Fingerprint,
    /// Remote page holding the note.
    pub page_id: String,
    /// RFC 3339 time of the write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<String>,
}

impl SyncRecord {
    pub fn new(fingerprint: Fingerprint, page_id: impl Into<String>) -> Self {
        Self {
            fingerprint,
            page_id: page_id.into(),
            synced_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }
}

/// Snapshot of all sync records, keyed by note path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncState {
    records: BTreeMap<String, SyncRecord>,
}

impl SyncState {
    pub fn get(&self, key: &str) -> Option<&SyncRecord> {
        self.records.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, record: SyncRecord) {
        self.records.insert(key.into(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SyncRecord)> {
        self.records.iter()
    }
}

/// Storage for [`SyncState`] owned by one pass at a time.
pub trait SyncStore {
    /// Take exclusive ownership of the store and read a snapshot.
    fn begin(&mut self) -> Result<SyncState>;

    /// Durably record a successful sync of `key`.
    fn commit(&mut self, key: &str, record: &SyncRecord) -> Result<()>;

    /// Release the ownership taken by [`SyncStore::begin`].
    fn finish(&mut self) -> Result<()>;
}

impl<S: SyncStore + ?Sized> SyncStore for &mut S {
    fn begin(&mut self) -> Result<SyncState> {
        (**self).begin()
    }

    fn commit(&mut self, key: &str, record: &SyncRecord) -> Result<()> {
        (**self).commit(key, record)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// On-disk state file layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StateFile {
    pub version: u32,
    /// Vaultsync version that wrote the file.
    #[serde(default)]
    pub written_by: String,
    #[serde(default)]
    pub notes: SyncState,
}

/// Default state file location for a vault:
/// `<data dir>/vaultsync/<vault hash>/state.json`.
///
/// Kept outside the vault so syncing never writes into it.
pub fn default_state_path(vault_root: &Path) -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join("vaultsync")
        .join(vault_hash(vault_root))
        .join("state.json")
}

/// Stable short hash of the vault path for the state directory name.
fn vault_hash(vault_root: &Path) -> String {
    let fingerprint = Fingerprint::of(vault_root.to_string_lossy().as_bytes());
    fingerprint.as_str()[..16].to_string()
}

/// Lock file path for a state file.
pub fn lock_file_path(state_path: &Path) -> PathBuf {
    let mut name = state_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    state_path.with_file_name(name)
}

/// Acquire the pass lock next to a state file.
///
/// The lock file holds the owner's PID. A lock left behind by a process that
/// no longer exists is reclaimed.
pub fn acquire_lock(state_path: &Path) -> Result<StateLock> {
    const MAX_ATTEMPTS: u32 = 20;
    const WAIT_MS: u64 = 100;

    let lock_path = lock_file_path(state_path);
    if let Some(parent) = lock_path.parent() {
        ensure_dir(parent)?;
    }

    let mut attempts = 0;
    loop {
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                return Ok(StateLock { path: lock_path });
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                attempts += 1;
                let owner = read_lock_owner(&lock_path);
                if let Some(pid) = owner {
                    if !process_alive(pid) && attempts < MAX_ATTEMPTS {
                        if reclaim_stale_lock(&lock_path, pid) {
                            tracing::warn!("removed stale lock held by pid {}", pid);
                        }
                        continue;
                    }
                }

                if attempts >= MAX_ATTEMPTS {
                    return Err(SyncError::StateLocked {
                        path: lock_path,
                        pid: owner.unwrap_or(0),
                    });
                }
                std::thread::sleep(std::time::Duration::from_millis(WAIT_MS));
            }
            Err(e) => {
                return Err(SyncError::StateError(format!(
                    "Failed to acquire state lock: {}",
                    e
                )));
            }
        }
    }
}

/// Guard that releases the state lock when dropped.
#[derive(Debug)]
pub struct StateLock {
    path: PathBuf,
}

impl StateLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn read_lock_owner(lock_path: &Path) -> Option<u32> {
    fs::read_to_string(lock_path).ok()?.trim().parse().ok()
}

/// Remove a lock file last seen holding `dead_pid`.
///
/// The file is renamed aside first, so at most one process takes it. If it
/// no longer holds `dead_pid`, a live owner replaced it after it was read and
/// it is linked back in place. Returns whether the stale lock was removed.
fn reclaim_stale_lock(lock_path: &Path, dead_pid: u32) -> bool {
    let mut name = lock_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".stale.{}", std::process::id()));
    let claimed = lock_path.with_file_name(name);

    if fs::rename(lock_path, &claimed).is_err() {
        return false;
    }

    if read_lock_owner(&claimed) == Some(dead_pid) {
        let _ = fs::remove_file(&claimed);
        return true;
    }

    // hard_link never overwrites, unlike rename.
    let _ = fs::hard_link(&claimed, lock_path);
    let _ = fs::remove_file(&claimed);
    false
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }
    // Signal 0 only checks that the process exists.
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// Ensure a directory exists.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.as_os_str().is_empty() && !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| {
            SyncError::StateError(format!("Failed to create {}: {}", dir.display(), e))
        })?;
    }
    Ok(())
}

/// Atomic write: write and sync a temp file, then rename it over `path`.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| SyncError::StateError("Invalid state file path".to_string()))?;
    ensure_dir(parent)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = parent.join(format!(".{}.tmp.{}", file_name, std::process::id()));

    let write = || -> std::io::Result<()> {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(contents)?;
        file.sync_all()
    };
    write().map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        SyncError::StateError(format!("Failed to write temp file: {}", e))
    })?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        SyncError::StateError(format!("Failed to rename temp file: {}", e))
    })?;

    Ok(())
}
