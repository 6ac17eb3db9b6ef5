use super::{SyncRecord, SyncState, SyncStore};
use crate::error::{Result, SyncError};

/// In-memory sync state for exercising a [`Syncer`](crate::Syncer) without a
/// state file. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: SyncState,
    active: bool,
    commits: usize,
    fail_commits: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot.
    pub fn with_state(state: SyncState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Number of successful commits.
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Make every subsequent commit fail.
    pub fn fail_commits(&mut self, fail: bool) {
        self.fail_commits = fail;
    }
}

impl SyncStore for MemoryStore {
    fn begin(&mut self) -> Result<SyncState> {
        if self.active {
            return Err(SyncError::StateError(
                "store already owned by a pass".to_string(),
            ));
        }
        self.active = true;
        Ok(self.state.clone())
    }

    fn commit(&mut self, key: &str, record: &SyncRecord) -> Result<()> {
        if !self.active {
            return Err(SyncError::StateError(
                "commit outside of an active pass".to_string(),
            ));
        }
        if self.fail_commits {
            return Err(SyncError::StateError(format!(
                "injected commit failure for {}",
                key
            )));
        }
        self.state.insert(key, record.clone());
        self.commits += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.active = false;
        Ok(())
    }
}
