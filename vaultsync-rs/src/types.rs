//! Shared types for vaultsync.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A Markdown file discovered in the vault.
#[derive(Debug, Clone)]
pub struct Note {
    /// Path relative to vault root (e.g., "proj/My Project.md").
    pub path: PathBuf,

    /// Absolute path on disk.
    pub absolute_path: PathBuf,

    /// Raw file bytes, frontmatter included.
    pub content: Vec<u8>,

    /// Last modification time. Informational only.
    pub modified: Option<SystemTime>,
}

impl Note {
    /// Create a note from in-memory content.
    pub fn new(path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        let path = path.into();
        Self {
            absolute_path: path.clone(),
            path,
            content: content.into(),
            modified: None,
        }
    }

    /// Read a note from disk.
    pub fn load(vault_root: &Path, relative_path: &Path) -> std::io::Result<Self> {
        let absolute_path = vault_root.join(relative_path);
        let content = std::fs::read(&absolute_path)?;
        let modified = std::fs::metadata(&absolute_path)
            .and_then(|m| m.modified())
            .ok();

        Ok(Self {
            path: relative_path.to_path_buf(),
            absolute_path,
            content,
            modified,
        })
    }

    /// Note name (filename without .md extension).
    pub fn name(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
    }

    /// Key used for this note in the sync state: the relative path with `/`
    /// separators on every platform.
    pub fn key(&self) -> String {
        note_key(&self.path)
    }

    /// Content as text, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// Build the sync-state key for a relative note path.
pub fn note_key(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Metadata recognised in a note's YAML header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frontmatter {
    /// Title override. The filename stem is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Tags without a leading `#`.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,

    /// Calendar date of the note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl Frontmatter {
    /// The page title for a note with this frontmatter.
    pub fn title_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.title.as_deref().unwrap_or(fallback)
    }
}

/// Kind of a Markdown list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Unordered,
    Ordered,
    Todo,
}

/// A block recognised by the Markdown parser.
///
/// Blocks are produced in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypedBlock {
    /// ATX heading, level 1 to 3.
    Heading { level: u8, text: String },

    /// List item. `checked` is only set for todo items.
    ListItem {
        kind: ListKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        checked: Option<bool>,
        text: String,
        depth: usize,
    },

    /// Block quote line without the `>` marker.
    Quote { text: String },

    /// Fenced code block.
    Code {
        #[serde(skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        text: String,
    },

    /// Remote image.
    Image { url: String },

    /// Anything else.
    Paragraph { text: String },
}

impl TypedBlock {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        TypedBlock::Heading {
            level,
            text: text.into(),
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        TypedBlock::Paragraph { text: text.into() }
    }

    pub fn bullet(text: impl Into<String>, depth: usize) -> Self {
        TypedBlock::ListItem {
            kind: ListKind::Unordered,
            checked: None,
            text: text.into(),
            depth,
        }
    }

    pub fn numbered(text: impl Into<String>, depth: usize) -> Self {
        TypedBlock::ListItem {
            kind: ListKind::Ordered,
            checked: None,
            text: text.into(),
            depth,
        }
    }

    pub fn todo(text: impl Into<String>, checked: bool, depth: usize) -> Self {
        TypedBlock::ListItem {
            kind: ListKind::Todo,
            checked: Some(checked),
            text: text.into(),
            depth,
        }
    }
}
