//! Vault enumeration.

use crate::error::{Result, SyncError};
use crate::types::{note_key, Note};
use glob::{glob, Pattern};
use std::path::{Path, PathBuf};

/// A directory tree of Markdown notes.
#[derive(Debug, Clone)]
pub struct Vault {
    /// Root path of the vault.
    pub root: PathBuf,

    /// Vault-relative globs of notes to leave alone.
    exclude: Vec<Pattern>,
}

impl Vault {
    /// Open a vault. The root must be an existing directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.is_dir() {
            return Err(SyncError::VaultNotFound(root));
        }

        Ok(Self {
            root,
            exclude: Vec::new(),
        })
    }

    /// Skip notes whose vault-relative path matches any of `patterns`.
    pub fn with_exclude<I, S>(mut self, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude = patterns
            .into_iter()
            .map(|p| Pattern::new(p.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(self)
    }

    /// Get the full path to a note.
    pub fn note_path(&self, relative_path: &Path) -> PathBuf {
        self.root.join(relative_path)
    }

    /// Load a note from the vault.
    pub fn load_note(&self, relative_path: &Path) -> Result<Note> {
        if !self.note_path(relative_path).is_file() {
            return Err(SyncError::NoteNotFound(relative_path.to_path_buf()));
        }
        Ok(Note::load(&self.root, relative_path)?)
    }

    /// Whether a vault-relative path is excluded by configuration.
    pub fn is_excluded(&self, relative_path: &Path) -> bool {
        let key = note_key(relative_path);
        self.exclude.iter().any(|p| p.matches(&key))
    }

    /// All Markdown notes, sorted by relative path.
    ///
    /// Hidden files and anything under a hidden directory are skipped.
    pub fn list_notes(&self) -> Result<Vec<PathBuf>> {
        let pattern = Path::new(&Pattern::escape(&self.root.to_string_lossy())).join("**/*.md");
        let pattern_str = pattern.to_string_lossy();

        let mut notes = Vec::new();

        for entry in glob(&pattern_str)? {
            match entry {
                Ok(path) => {
                    if !path.is_file() {
                        continue;
                    }
                    if let Ok(relative) = path.strip_prefix(&self.root) {
                        if is_hidden(relative) || self.is_excluded(relative) {
                            continue;
                        }
                        notes.push(relative.to_path_buf());
                    }
                }
                Err(e) => {
                    tracing::warn!("skipping unreadable path: {}", e);
                }
            }
        }

        notes.sort();

        Ok(notes)
    }
}

fn is_hidden(relative: &Path) -> bool {
    relative
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}
