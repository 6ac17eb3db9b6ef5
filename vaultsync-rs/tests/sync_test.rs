//! End-to-end sync passes against a temporary vault.

use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;
use vaultsync::convert::RemoteBlock;
use vaultsync::detect::Fingerprint;
use vaultsync::error::RemoteError;
use vaultsync::remote::{MemoryClient, PageId, PageMeta, RemoteClient};
use vaultsync::state::{acquire_lock, JsonFileStore};
use vaultsync::{PassSummary, SyncError, SyncOptions, Syncer, Vault};

struct Fixture {
    dir: TempDir,
    state_path: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("vault")).unwrap();
        let state_path = dir.path().join("state").join("state.json");
        Self { dir, state_path }
    }

    fn root(&self) -> PathBuf {
        self.dir.path().join("vault")
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn pass<C: RemoteClient>(&self, client: C) -> PassSummary {
        self.pass_with(client, &AtomicBool::new(false))
    }

    fn pass_with<C: RemoteClient>(&self, client: C, cancel: &AtomicBool) -> PassSummary {
        self.try_pass(client, cancel).unwrap()
    }

    fn try_pass<C: RemoteClient>(
        &self,
        client: C,
        cancel: &AtomicBool,
    ) -> Result<PassSummary, SyncError> {
        let vault = Vault::new(self.root()).unwrap();
        let store = JsonFileStore::new(&self.state_path);
        Syncer::new(vault, store, client).run_pass(cancel)
    }

    fn fingerprint_of(&self, key: &str) -> Option<Fingerprint> {
        JsonFileStore::read(&self.state_path)
            .unwrap()
            .get(key)
            .map(|r| r.fingerprint.clone())
    }
}

fn counts(summary: &PassSummary) -> (usize, usize, usize, usize) {
    (
        summary.created,
        summary.updated,
        summary.skipped,
        summary.failed,
    )
}

#[test]
fn one_new_note_among_unchanged_ones() {
    let fx = Fixture::new();
    fx.write("A.md", "# A\n");
    fx.write("B.md", "# B\n");
    fx.pass(MemoryClient::new());

    fx.write("C.md", "# C\n");
    let mut client = MemoryClient::new();
    let summary = fx.pass(&mut client);

    assert_eq!(counts(&summary), (1, 0, 2, 0));
    assert_eq!(client.create_calls(), 1);
    assert!(!summary.cancelled);
}

#[test]
fn unchanged_vault_makes_no_writes() {
    let fx = Fixture::new();
    fx.write("A.md", "alpha");
    fx.write("notes/B.md", "beta");
    fx.pass(MemoryClient::new());

    // Rewriting identical bytes is not a change.
    fx.write("A.md", "alpha");

    let mut client = MemoryClient::new();
    let summary = fx.pass(&mut client);
    assert_eq!(counts(&summary), (0, 0, 2, 0));
    assert!(client.calls().is_empty());
}

#[test]
fn failed_note_keeps_its_record() {
    let fx = Fixture::new();
    fx.write("A.md", "a1");
    fx.write("B.md", "b1");
    fx.write("C.md", "c1");

    let mut client = MemoryClient::new();
    fx.pass(&mut client);
    let b_before = fx.fingerprint_of("B.md").unwrap();

    fx.write("A.md", "a2");
    fx.write("B.md", "b2");
    fx.write("C.md", "c2");
    client.fail_on_title("B");

    let summary = fx.pass(&mut client);
    assert_eq!(counts(&summary), (0, 2, 0, 1));
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].path, "B.md");
    assert_eq!(fx.fingerprint_of("B.md"), Some(b_before));
    assert_eq!(fx.fingerprint_of("A.md"), Some(Fingerprint::of(b"a2")));
    assert_eq!(fx.fingerprint_of("C.md"), Some(Fingerprint::of(b"c2")));

    // The failed note is retried on the next pass.
    client.clear_failures();
    let summary = fx.pass(&mut client);
    assert_eq!(counts(&summary), (0, 1, 2, 0));
}

/// Wraps a client and raises the cancel flag after the first page is created.
struct CancelAfterCreate<'a> {
    inner: MemoryClient,
    cancel: &'a AtomicBool,
}

impl RemoteClient for CancelAfterCreate<'_> {
    fn create_page(
        &mut self,
        meta: &PageMeta,
        blocks: &[RemoteBlock],
    ) -> Result<PageId, RemoteError> {
        let id = self.inner.create_page(meta, blocks)?;
        self.cancel.store(true, Ordering::SeqCst);
        Ok(id)
    }

    fn replace_blocks(&mut self, page_id: &str, blocks: &[RemoteBlock]) -> Result<(), RemoteError> {
        self.inner.replace_blocks(page_id, blocks)
    }
}

#[test]
fn cancelled_pass_keeps_completed_notes() {
    let fx = Fixture::new();
    fx.write("A.md", "a");
    fx.write("B.md", "b");
    fx.write("C.md", "c");

    let cancel = AtomicBool::new(false);
    let client = CancelAfterCreate {
        inner: MemoryClient::new(),
        cancel: &cancel,
    };
    let summary = fx.pass_with(client, &cancel);

    assert!(summary.cancelled);
    assert_eq!(counts(&summary), (1, 0, 0, 0));
    assert!(fx.fingerprint_of("A.md").is_some());
    assert!(fx.fingerprint_of("B.md").is_none());

    let summary = fx.pass(MemoryClient::new());
    assert_eq!(counts(&summary), (2, 0, 1, 0));
}

#[test]
fn dry_run_leaves_state_untouched() {
    let fx = Fixture::new();
    fx.write("A.md", "a");

    let vault = Vault::new(fx.root()).unwrap();
    let mut client = MemoryClient::new();
    let summary = Syncer::new(vault, JsonFileStore::new(&fx.state_path), &mut client)
        .with_options(SyncOptions {
            dry_run: true,
            ..Default::default()
        })
        .run_pass(&AtomicBool::new(false))
        .unwrap();

    assert_eq!(counts(&summary), (1, 0, 0, 0));
    assert!(client.calls().is_empty());
    assert!(!fx.state_path.exists());
}

#[test]
fn state_file_is_versioned_json() {
    let fx = Fixture::new();
    fx.write("sub/Note.md", "hello");
    fx.pass(MemoryClient::new());

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&fx.state_path).unwrap()).unwrap();
    assert_eq!(raw["version"], 1);
    assert_eq!(raw["notes"]["sub/Note.md"]["page_id"], "page-1");
    assert_eq!(
        raw["notes"]["sub/Note.md"]["fingerprint"],
        Fingerprint::of(b"hello").as_str()
    );
    assert!(!Path::new(&format!("{}.lock", fx.state_path.display())).exists());
}

#[test]
fn locked_state_fails_the_pass() {
    let fx = Fixture::new();
    fx.write("A.md", "a");
    let _held = acquire_lock(&fx.state_path).unwrap();

    let mut client = MemoryClient::new();
    let result = fx.try_pass(&mut client, &AtomicBool::new(false));
    assert!(matches!(result, Err(SyncError::StateLocked { .. })));
    assert!(client.calls().is_empty());
}

#[test]
fn note_content_reaches_the_page() {
    let fx = Fixture::new();
    fx.write(
        "Project.md",
        "---\ntitle: Launch Plan\ntags: [work, q3]\ndate: 2024-07-01\n---\n\
         # Goals\n\
         See [[Roadmap|the roadmap]].\n\
         - [ ] ship\n  - write docs\n\
         ```rust\nfn main() {}\n```\n\
         ![[diagram.png]]\n",
    );

    let mut client = MemoryClient::new();
    fx.pass(&mut client);

    let (_, page) = client.pages().iter().next().unwrap();
    assert_eq!(page.meta.title, "Launch Plan");
    assert_eq!(page.meta.tags, vec!["q3", "work"]);
    assert_eq!(page.meta.date.unwrap().to_string(), "2024-07-01");
    assert_eq!(
        page.blocks,
        vec![
            RemoteBlock::Heading {
                level: 1,
                text: "Goals".to_string(),
            },
            RemoteBlock::Paragraph {
                text: "See the roadmap.".to_string(),
            },
            RemoteBlock::ToDo {
                text: "ship".to_string(),
                checked: false,
                children: vec![RemoteBlock::BulletedListItem {
                    text: "write docs".to_string(),
                    children: vec![],
                }],
            },
            RemoteBlock::Code {
                language: "rust".to_string(),
                text: "fn main() {}".to_string(),
            },
            RemoteBlock::Paragraph {
                text: "[Image: diagram.png]".to_string(),
            },
        ]
    );
}
