//! Sync orchestration.
//!
//! One pass walks the vault in path order. Each note is fingerprinted and
//! compared with the stored record; unchanged notes are skipped without any
//! remote call. Changed notes go through frontmatter extraction, wikilink
//! resolution, block parsing and conversion, then a remote write. The record
//! is committed only after the write succeeded, so a failed or interrupted
//! note is retried on the next pass.

use crate::convert::{convert_blocks, RemoteBlock};
use crate::detect::{detect, Decision};
use crate::error::{RemoteError, Result, SyncError};
use crate::parser::parse_note;
use crate::remote::{PageId, PageMeta, RemoteClient};
use crate::state::{SyncRecord, SyncState, SyncStore};
use crate::types::{note_key, Frontmatter, Note};
use crate::vault::Vault;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Per-pass behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Detect and convert, but make no remote calls and commit nothing.
    pub dry_run: bool,
    /// On create, reuse an existing page with the same title unless another
    /// note already holds it.
    pub adopt_existing_pages: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            adopt_existing_pages: true,
        }
    }
}

/// What happened to one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Created,
    Updated,
    Skipped,
    Failed(String),
}

/// A note that could not be synced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: String,
    pub error: String,
}

/// Counts for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FileFailure>,
    /// The pass stopped early on request.
    pub cancelled: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub dry_run: bool,
}

impl PassSummary {
    /// Count one note's outcome.
    pub fn record(&mut self, path: &str, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Created => self.created += 1,
            FileOutcome::Updated => self.updated += 1,
            FileOutcome::Skipped => self.skipped += 1,
            FileOutcome::Failed(error) => {
                self.failed += 1;
                self.failures.push(FileFailure {
                    path: path.to_string(),
                    error,
                });
            }
        }
    }

    /// Notes looked at in this pass.
    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.failed
    }
}

/// Page properties and blocks for one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPage {
    pub frontmatter: Frontmatter,
    pub meta: PageMeta,
    pub blocks: Vec<RemoteBlock>,
}

/// Run a note through the parsing and conversion pipeline.
pub fn prepare_page(note: &Note) -> Result<PreparedPage> {
    let text = note
        .text()
        .ok_or_else(|| SyncError::InvalidUtf8(note.path.clone()))?;
    let parsed = parse_note(text);
    let meta = PageMeta::from_frontmatter(note.name(), &parsed.frontmatter);
    let blocks = convert_blocks(parsed.blocks);

    Ok(PreparedPage {
        frontmatter: parsed.frontmatter,
        meta,
        blocks,
    })
}

/// Drives passes over one vault.
pub struct Syncer<S, C> {
    vault: Vault,
    store: S,
    client: C,
    options: SyncOptions,
    /// Pages held by some note, from the snapshot and this pass's writes.
    claimed: HashSet<PageId>,
}

impl<S: SyncStore, C: RemoteClient> Syncer<S, C> {
    pub fn new(vault: Vault, store: S, client: C) -> Self {
        Self {
            vault,
            store,
            client,
            options: SyncOptions::default(),
            claimed: HashSet::new(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run one pass over the vault.
    ///
    /// `cancel` is checked before each note; once set, the pass stops and the
    /// summary is marked cancelled. Per-note failures are counted, never
    /// returned. An `Err` means the pass itself failed.
    pub fn run_pass(&mut self, cancel: &AtomicBool) -> Result<PassSummary> {
        if !self.vault.root.is_dir() {
            return Err(SyncError::VaultNotFound(self.vault.root.clone()));
        }

        let notes = self.vault.list_notes()?;
        let state = self.store.begin()?;
        tracing::debug!(
            "pass over {} notes, {} known records",
            notes.len(),
            state.len()
        );

        self.claimed = state.iter().map(|(_, r)| r.page_id.clone()).collect();
        let result = self.sync_notes(&notes, &state, cancel);
        let finished = self.store.finish();
        let summary = result?;
        finished?;

        tracing::info!(
            "pass finished: {} created, {} updated, {} skipped, {} failed{}",
            summary.created,
            summary.updated,
            summary.skipped,
            summary.failed,
            if summary.cancelled { " (cancelled)" } else { "" }
        );
        Ok(summary)
    }

    fn sync_notes(
        &mut self,
        notes: &[PathBuf],
        state: &SyncState,
        cancel: &AtomicBool,
    ) -> Result<PassSummary> {
        let mut summary = PassSummary {
            dry_run: self.options.dry_run,
            ..Default::default()
        };

        for relative in notes {
            if cancel.load(Ordering::SeqCst) {
                tracing::info!("pass cancelled after {} notes", summary.total());
                summary.cancelled = true;
                break;
            }

            let key = note_key(relative);
            let outcome = self.sync_note(relative, &key, state)?;
            if let FileOutcome::Failed(error) = &outcome {
                tracing::warn!("{}: {}", key, error);
            }
            summary.record(&key, outcome);
        }

        Ok(summary)
    }

    /// Sync one note. Only store failures are returned as errors.
    fn sync_note(
        &mut self,
        relative: &Path,
        key: &str,
        state: &SyncState,
    ) -> Result<FileOutcome> {
        let note = match Note::load(&self.vault.root, relative) {
            Ok(note) => note,
            Err(e) => return Ok(FileOutcome::Failed(format!("read failed: {}", e))),
        };

        let detection = detect(key, &note.content, state);
        if detection.decision == Decision::Skip {
            tracing::debug!("{}: unchanged", key);
            return Ok(FileOutcome::Skipped);
        }

        let page = match prepare_page(&note) {
            Ok(page) => page,
            Err(e) => return Ok(FileOutcome::Failed(e.to_string())),
        };

        if self.options.dry_run {
            return Ok(match detection.decision {
                Decision::Update { .. } => {
                    tracing::info!("{}: would update", key);
                    FileOutcome::Updated
                }
                _ => {
                    tracing::info!("{}: would create", key);
                    FileOutcome::Created
                }
            });
        }

        let written = match detection.decision {
            Decision::Update { page_id } => self.update(&page_id, &page),
            _ => self.create(&page),
        };

        match written {
            Ok((page_id, outcome)) => {
                let record = SyncRecord::new(detection.fingerprint, page_id.clone());
                self.store.commit(key, &record)?;
                self.claimed.insert(page_id.clone());
                match outcome {
                    FileOutcome::Created => tracing::info!("{}: created page {}", key, page_id),
                    _ => tracing::info!("{}: updated page {}", key, page_id),
                }
                Ok(outcome)
            }
            Err(e) => Ok(FileOutcome::Failed(e.to_string())),
        }
    }

    fn create(
        &mut self,
        page: &PreparedPage,
    ) -> std::result::Result<(PageId, FileOutcome), RemoteError> {
        if self.options.adopt_existing_pages {
            match self.client.find_page(&page.meta.title)? {
                Some(page_id) if self.claimed.contains(&page_id) => {
                    tracing::debug!(
                        "page {} titled '{}' belongs to another note",
                        page_id,
                        page.meta.title
                    );
                }
                Some(page_id) => {
                    tracing::debug!("adopting existing page {} for '{}'", page_id, page.meta.title);
                    self.write_existing(&page_id, page)?;
                    return Ok((page_id, FileOutcome::Updated));
                }
                None => {}
            }
        }

        let page_id = self.client.create_page(&page.meta, &page.blocks)?;
        Ok((page_id, FileOutcome::Created))
    }

    fn update(
        &mut self,
        page_id: &str,
        page: &PreparedPage,
    ) -> std::result::Result<(PageId, FileOutcome), RemoteError> {
        match self.write_existing(page_id, page) {
            Ok(()) => Ok((page_id.to_string(), FileOutcome::Updated)),
            // The page was deleted remotely since the last pass.
            Err(RemoteError::PageNotFound(_)) => {
                tracing::warn!("page {} is gone, creating a new one", page_id);
                let page_id = self.client.create_page(&page.meta, &page.blocks)?;
                Ok((page_id, FileOutcome::Created))
            }
            Err(e) => Err(e),
        }
    }

    fn write_existing(
        &mut self,
        page_id: &str,
        page: &PreparedPage,
    ) -> std::result::Result<(), RemoteError> {
        self.client.update_properties(page_id, &page.meta)?;
        self.client.replace_blocks(page_id, &page.blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{MemoryClient, RemoteCall};
    use crate::state::MemoryStore;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn syncer(dir: &TempDir) -> Syncer<MemoryStore, MemoryClient> {
        let vault = Vault::new(dir.path()).unwrap();
        Syncer::new(vault, MemoryStore::new(), MemoryClient::new())
    }

    fn run(syncer: &mut Syncer<MemoryStore, MemoryClient>) -> PassSummary {
        syncer.run_pass(&AtomicBool::new(false)).unwrap()
    }

    #[test]
    fn test_prepare_page_uses_stem_and_frontmatter() {
        let note = Note::new(
            "daily/2024-01-01.md",
            "---\ntags: [journal]\n---\n# Day\nText",
        );
        let page = prepare_page(&note).unwrap();
        assert_eq!(page.meta.title, "2024-01-01");
        assert_eq!(page.meta.tags, vec!["journal"]);
        assert_eq!(page.blocks.len(), 2);
    }

    #[test]
    fn test_prepare_page_rejects_invalid_utf8() {
        let note = Note::new("bad.md", vec![0xff, 0xfe]);
        assert!(matches!(
            prepare_page(&note),
            Err(SyncError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_first_pass_creates_then_skips() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.md", "# A");
        write(&dir, "b.md", "# B");
        let mut syncer = syncer(&dir);

        let first = run(&mut syncer);
        assert_eq!((first.created, first.skipped), (2, 0));

        let second = run(&mut syncer);
        assert_eq!((second.created, second.skipped), (0, 2));
        assert_eq!(syncer.client().create_calls(), 2);
    }

    #[test]
    fn test_changed_note_updates_same_page() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.md", "# A");
        let mut syncer = syncer(&dir);
        run(&mut syncer);
        let page_id = syncer.store().state().get("a.md").unwrap().page_id.clone();

        write(&dir, "a.md", "# A\nmore");
        let summary = run(&mut syncer);
        assert_eq!(summary.updated, 1);
        assert_eq!(syncer.client().page(&page_id).unwrap().blocks.len(), 2);
        assert_eq!(
            syncer.store().state().get("a.md").unwrap().page_id,
            page_id
        );
    }

    #[test]
    fn test_adopts_page_with_same_title() {
        let dir = TempDir::new().unwrap();
        write(&dir, "Home.md", "hello");
        let mut client = MemoryClient::new();
        let existing = client.insert_page(PageMeta::new("Home"));
        let vault = Vault::new(dir.path()).unwrap();
        let mut syncer = Syncer::new(vault, MemoryStore::new(), client);

        let summary = run(&mut syncer);
        assert_eq!((summary.created, summary.updated), (0, 1));
        assert_eq!(syncer.client().create_calls(), 0);
        assert_eq!(
            syncer.store().state().get("Home.md").unwrap().page_id,
            existing
        );
    }

    #[test]
    fn test_same_title_in_one_pass_gets_own_pages() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a/Index.md", "alpha content");
        write(&dir, "b/Index.md", "beta content");
        let mut syncer = syncer(&dir);

        let summary = run(&mut syncer);
        assert_eq!((summary.created, summary.updated), (2, 0));

        let a = syncer.store().state().get("a/Index.md").unwrap().page_id.clone();
        let b = syncer.store().state().get("b/Index.md").unwrap().page_id.clone();
        assert_ne!(a, b);
        assert_eq!(
            syncer.client().page(&a).unwrap().blocks,
            vec![RemoteBlock::Paragraph {
                text: "alpha content".to_string()
            }]
        );
        assert_eq!(
            syncer.client().page(&b).unwrap().blocks,
            vec![RemoteBlock::Paragraph {
                text: "beta content".to_string()
            }]
        );
    }

    #[test]
    fn test_recorded_page_is_not_adopted_by_another_note() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a/Index.md", "alpha content");
        let mut syncer = syncer(&dir);
        run(&mut syncer);
        let a = syncer.store().state().get("a/Index.md").unwrap().page_id.clone();

        write(&dir, "b/Index.md", "beta content");
        let summary = run(&mut syncer);
        assert_eq!((summary.created, summary.updated, summary.skipped), (1, 0, 1));
        assert_ne!(
            syncer.store().state().get("b/Index.md").unwrap().page_id,
            a
        );
        assert_eq!(syncer.client().page(&a).unwrap().blocks.len(), 1);
        assert!(!syncer
            .client()
            .calls()
            .iter()
            .any(|c| matches!(c, RemoteCall::ReplaceBlocks { page_id, .. } if *page_id == a)));
    }

    #[test]
    fn test_no_adopt_creates_duplicate() {
        let dir = TempDir::new().unwrap();
        write(&dir, "Home.md", "hello");
        let mut client = MemoryClient::new();
        client.insert_page(PageMeta::new("Home"));
        let vault = Vault::new(dir.path()).unwrap();
        let mut syncer = Syncer::new(vault, MemoryStore::new(), client).with_options(SyncOptions {
            adopt_existing_pages: false,
            ..Default::default()
        });

        let summary = run(&mut syncer);
        assert_eq!(summary.created, 1);
        assert!(!syncer
            .client()
            .calls()
            .iter()
            .any(|c| matches!(c, RemoteCall::FindPage { .. })));
    }

    #[test]
    fn test_deleted_remote_page_is_recreated() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.md", "v1");
        let mut state = SyncState::default();
        state.insert(
            "a.md",
            SyncRecord::new(crate::detect::Fingerprint::of(b"v0"), "gone"),
        );
        let vault = Vault::new(dir.path()).unwrap();
        let mut syncer = Syncer::new(vault, MemoryStore::with_state(state), MemoryClient::new());

        let summary = run(&mut syncer);
        assert_eq!(summary.created, 1);
        assert_ne!(syncer.store().state().get("a.md").unwrap().page_id, "gone");
    }

    #[test]
    fn test_dry_run_makes_no_calls() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.md", "# A");
        let vault = Vault::new(dir.path()).unwrap();
        let mut syncer =
            Syncer::new(vault, MemoryStore::new(), MemoryClient::new()).with_options(SyncOptions {
                dry_run: true,
                ..Default::default()
            });

        let summary = run(&mut syncer);
        assert_eq!(summary.created, 1);
        assert!(summary.dry_run);
        assert!(syncer.client().calls().is_empty());
        assert_eq!(syncer.store().commits(), 0);
    }

    #[test]
    fn test_invalid_utf8_is_per_file_failure() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.md", "ok");
        fs::write(dir.path().join("b.md"), [0xff, 0xfe, 0xfd]).unwrap();
        let mut syncer = syncer(&dir);

        let summary = run(&mut syncer);
        assert_eq!((summary.created, summary.failed), (1, 1));
        assert_eq!(summary.failures[0].path, "b.md");
        assert!(syncer.store().state().get("b.md").is_none());
    }

    #[test]
    fn test_commit_failure_fails_pass() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.md", "x");
        let mut store = MemoryStore::new();
        store.fail_commits(true);
        let vault = Vault::new(dir.path()).unwrap();
        let mut syncer = Syncer::new(vault, &mut store, MemoryClient::new());

        assert!(matches!(
            syncer.run_pass(&AtomicBool::new(false)),
            Err(SyncError::StateError(_))
        ));
        drop(syncer);

        // The store was released despite the error.
        store.fail_commits(false);
        assert!(store.begin().is_ok());
    }

    #[test]
    fn test_cancelled_before_first_note() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.md", "x");
        let mut syncer = syncer(&dir);

        let summary = syncer.run_pass(&AtomicBool::new(true)).unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.total(), 0);
        assert!(syncer.client().calls().is_empty());
    }

    #[test]
    fn test_vault_removed_between_passes() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("vault");
        fs::create_dir(&root).unwrap();
        let vault = Vault::new(&root).unwrap();
        let mut syncer = Syncer::new(vault, MemoryStore::new(), MemoryClient::new());

        fs::remove_dir(&root).unwrap();
        assert!(matches!(
            syncer.run_pass(&AtomicBool::new(false)),
            Err(SyncError::VaultNotFound(_))
        ));
    }

    #[test]
    fn test_summary_serializes_counts() {
        let mut summary = PassSummary::default();
        summary.record("a.md", FileOutcome::Created);
        summary.record("b.md", FileOutcome::Failed("boom".to_string()));
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["created"], 1);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["failures"][0]["path"], "b.md");
        assert!(json.get("dry_run").is_none());
    }
}
