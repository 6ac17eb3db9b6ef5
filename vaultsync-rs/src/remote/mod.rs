//! Remote document store clients.

mod memory;
mod notion;

pub use memory::{MemoryClient, MemoryPage, RemoteCall};
pub use notion::NotionClient;

use crate::convert::RemoteBlock;
use crate::error::RemoteError;
use crate::types::Frontmatter;
use chrono::NaiveDate;
use serde::Serialize;

/// Identifier of a remote page.
pub type PageId = String;

/// Page level properties written alongside the blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub title: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl PageMeta {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tags: Vec::new(),
            date: None,
        }
    }

    /// Page properties for a note. `fallback_title` is used when the
    /// frontmatter has no title.
    pub fn from_frontmatter(fallback_title: &str, frontmatter: &Frontmatter) -> Self {
        Self {
            title: frontmatter.title_or(fallback_title).to_string(),
            tags: frontmatter.tags.iter().cloned().collect(),
            date: frontmatter.date,
        }
    }
}

/// Write access to a remote database of pages.
///
/// Calls are fallible and never retried by the caller.
pub trait RemoteClient {
    /// Create a page holding `blocks` and return its id.
    fn create_page(
        &mut self,
        meta: &PageMeta,
        blocks: &[RemoteBlock],
    ) -> Result<PageId, RemoteError>;

    /// Replace the whole content of an existing page.
    fn replace_blocks(&mut self, page_id: &str, blocks: &[RemoteBlock]) -> Result<(), RemoteError>;

    /// Overwrite the properties of an existing page.
    fn update_properties(&mut self, _page_id: &str, _meta: &PageMeta) -> Result<(), RemoteError> {
        Ok(())
    }

    /// Look up a page by exact title.
    fn find_page(&mut self, _title: &str) -> Result<Option<PageId>, RemoteError> {
        Ok(None)
    }
}

impl<C: RemoteClient + ?Sized> RemoteClient for &mut C {
    fn create_page(
        &mut self,
        meta: &PageMeta,
        blocks: &[RemoteBlock],
    ) -> Result<PageId, RemoteError> {
        (**self).create_page(meta, blocks)
    }

    fn replace_blocks(&mut self, page_id: &str, blocks: &[RemoteBlock]) -> Result<(), RemoteError> {
        (**self).replace_blocks(page_id, blocks)
    }

    fn update_properties(&mut self, page_id: &str, meta: &PageMeta) -> Result<(), RemoteError> {
        (**self).update_properties(page_id, meta)
    }

    fn find_page(&mut self, title: &str) -> Result<Option<PageId>, RemoteError> {
        (**self).find_page(title)
    }
}
