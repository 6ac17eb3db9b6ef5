use super::{PageId, PageMeta, RemoteClient};
use crate::convert::RemoteBlock;
use crate::error::RemoteError;
use std::collections::{BTreeMap, HashSet};

/// One call made against a [`MemoryClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    CreatePage { title: String, blocks: usize },
    ReplaceBlocks { page_id: PageId, blocks: usize },
    UpdateProperties { page_id: PageId, title: String },
    FindPage { title: String },
}

/// A page held by a [`MemoryClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPage {
    pub meta: PageMeta,
    pub blocks: Vec<RemoteBlock>,
}

/// In-process remote that records every call.
///
/// Pages get sequential ids (`page-1`, `page-2`, ...). Failures can be
/// injected per title or per page id.
#[derive(Debug, Default)]
pub struct MemoryClient {
    pages: BTreeMap<PageId, MemoryPage>,
    calls: Vec<RemoteCall>,
    next_id: usize,
    fail_titles: HashSet<String>,
    fail_pages: HashSet<PageId>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a page that exists before any sync. Returns its id.
    pub fn insert_page(&mut self, meta: PageMeta) -> PageId {
        let id = self.allocate_id();
        self.pages.insert(
            id.clone(),
            MemoryPage {
                meta,
                blocks: Vec::new(),
            },
        );
        id
    }

    /// Fail every write for a page with this title.
    pub fn fail_on_title(&mut self, title: impl Into<String>) {
        self.fail_titles.insert(title.into());
    }

    /// Fail every write to this page.
    pub fn fail_on_page(&mut self, page_id: impl Into<PageId>) {
        self.fail_pages.insert(page_id.into());
    }

    /// Stop injecting failures.
    pub fn clear_failures(&mut self) {
        self.fail_titles.clear();
        self.fail_pages.clear();
    }

    pub fn calls(&self) -> &[RemoteCall] {
        &self.calls
    }

    pub fn pages(&self) -> &BTreeMap<PageId, MemoryPage> {
        &self.pages
    }

    pub fn page(&self, page_id: &str) -> Option<&MemoryPage> {
        self.pages.get(page_id)
    }

    /// Calls that change remote state.
    pub fn write_calls(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| !matches!(c, RemoteCall::FindPage { .. }))
            .count()
    }

    /// Number of `create_page` calls.
    pub fn create_calls(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RemoteCall::CreatePage { .. }))
            .count()
    }

    fn allocate_id(&mut self) -> PageId {
        self.next_id += 1;
        format!("page-{}", self.next_id)
    }

    fn check_title(&self, title: &str) -> Result<(), RemoteError> {
        if self.fail_titles.contains(title) {
            return Err(RemoteError::Api {
                status: 500,
                message: format!("injected failure for {}", title),
            });
        }
        Ok(())
    }

    fn page_mut(&mut self, page_id: &str) -> Result<&mut MemoryPage, RemoteError> {
        if self.fail_pages.contains(page_id) {
            return Err(RemoteError::Api {
                status: 500,
                message: format!("injected failure for {}", page_id),
            });
        }
        let title = match self.pages.get(page_id) {
            Some(page) => page.meta.title.clone(),
            None => return Err(RemoteError::PageNotFound(page_id.to_string())),
        };
        self.check_title(&title)?;
        self.pages
            .get_mut(page_id)
            .ok_or_else(|| RemoteError::PageNotFound(page_id.to_string()))
    }
}

impl RemoteClient for MemoryClient {
    fn create_page(
        &mut self,
        meta: &PageMeta,
        blocks: &[RemoteBlock],
    ) -> Result<PageId, RemoteError> {
        self.calls.push(RemoteCall::CreatePage {
            title: meta.title.clone(),
            blocks: blocks.len(),
        });
        self.check_title(&meta.title)?;

        let id = self.allocate_id();
        self.pages.insert(
            id.clone(),
            MemoryPage {
                meta: meta.clone(),
                blocks: blocks.to_vec(),
            },
        );
        Ok(id)
    }

    fn replace_blocks(&mut self, page_id: &str, blocks: &[RemoteBlock]) -> Result<(), RemoteError> {
        self.calls.push(RemoteCall::ReplaceBlocks {
            page_id: page_id.to_string(),
            blocks: blocks.len(),
        });
        self.page_mut(page_id)?.blocks = blocks.to_vec();
        Ok(())
    }

    fn update_properties(&mut self, page_id: &str, meta: &PageMeta) -> Result<(), RemoteError> {
        self.calls.push(RemoteCall::UpdateProperties {
            page_id: page_id.to_string(),
            title: meta.title.clone(),
        });
        // A retitled page is checked against its new title too.
        self.check_title(&meta.title)?;
        self.page_mut(page_id)?.meta = meta.clone();
        Ok(())
    }

    fn find_page(&mut self, title: &str) -> Result<Option<PageId>, RemoteError> {
        self.calls.push(RemoteCall::FindPage {
            title: title.to_string(),
        });
        Ok(self
            .pages
            .iter()
            .find(|(_, page)| page.meta.title == title)
            .map(|(id, _)| id.clone()))
    }
}
