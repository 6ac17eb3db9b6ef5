//! Content fingerprinting and change detection.
//!
//! Decisions are made from content bytes only. Touching a file without
//! changing it never triggers a remote write.

use crate::state::SyncState;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 digest of a note's raw bytes, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint raw content.
    pub fn of(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        Fingerprint(format!("{:x}", digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Fingerprint {
    fn from(value: String) -> Self {
        Fingerprint(value)
    }
}

/// What the orchestrator should do with a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Content unchanged since the last successful sync.
    Skip,
    /// Never synced.
    Create,
    /// Synced before, content changed since.
    Update { page_id: String },
}

/// Result of checking one note against the sync state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub fingerprint: Fingerprint,
    pub decision: Decision,
}

/// Fingerprint `content` and compare it with the record stored for `key`.
pub fn detect(key: &str, content: &[u8], state: &SyncState) -> Detection {
    let fingerprint = Fingerprint::of(content);

    let decision = match state.get(key) {
        None => Decision::Create,
        Some(record) if record.fingerprint == fingerprint => Decision::Skip,
        Some(record) => Decision::Update {
            page_id: record.page_id.clone(),
        },
    };

    Detection {
        fingerprint,
        decision,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SyncRecord;

    fn state_with(key: &str, content: &[u8], page_id: &str) -> SyncState {
        let mut state = SyncState::default();
        state.insert(key, SyncRecord::new(Fingerprint::of(content), page_id));
        state
    }

    #[test]
    fn test_fingerprint_deterministic() {
        assert_eq!(Fingerprint::of(b"# Hello"), Fingerprint::of(b"# Hello"));
        assert_eq!(Fingerprint::of(b"").as_str().len(), 64);
    }

    #[test]
    fn test_fingerprint_known_value() {
        assert_eq!(
            Fingerprint::of(b"abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_fingerprint_sensitive_to_every_byte() {
        let base = b"# Title\n\nSome body text.\n".to_vec();
        let original = Fingerprint::of(&base);
        for i in 0..base.len() {
            let mut changed = base.clone();
            changed[i] ^= 0x01;
            assert_ne!(Fingerprint::of(&changed), original, "byte {}", i);
        }

        let mut crlf = base.clone();
        crlf.insert(7, b'\r');
        assert_ne!(Fingerprint::of(&crlf), original);
    }

    #[test]
    fn test_create_without_record() {
        let detection = detect("a.md", b"content", &SyncState::default());
        assert_eq!(detection.decision, Decision::Create);
        assert_eq!(detection.fingerprint, Fingerprint::of(b"content"));
    }

    #[test]
    fn test_skip_when_unchanged() {
        let state = state_with("a.md", b"content", "page-1");
        assert_eq!(detect("a.md", b"content", &state).decision, Decision::Skip);
    }

    #[test]
    fn test_update_when_changed() {
        let state = state_with("a.md", b"content", "page-1");
        assert_eq!(
            detect("a.md", b"content!", &state).decision,
            Decision::Update {
                page_id: "page-1".to_string()
            }
        );
    }

    #[test]
    fn test_records_are_per_path() {
        let state = state_with("a.md", b"content", "page-1");
        assert_eq!(detect("b.md", b"content", &state).decision, Decision::Create);
    }
}
